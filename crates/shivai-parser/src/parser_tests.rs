use super::*;
use shivai_protocols::{HistoryRecord, OutcomeStatus};
use std::path::PathBuf;
use uuid::Uuid;

fn parser() -> IntentParser {
    IntentParser::new()
}

fn snapshot_with(categories: &[IntentCategory]) -> ContextSnapshot {
    let mut snapshot = ContextSnapshot::empty();
    snapshot.recent = categories
        .iter()
        .map(|c| HistoryRecord::new(Uuid::new_v4(), *c, OutcomeStatus::Succeeded, None))
        .collect();
    snapshot
}

fn text(intent: &Intent, slot: &str) -> Option<String> {
    intent
        .entity(slot)
        .and_then(|v| v.as_text())
        .map(str::to_string)
}

#[test]
fn test_mixed_language_unlock() {
    let intent = parser().parse("phone unlock karo", None);
    assert_eq!(intent.category(), IntentCategory::DeviceUnlock);
    assert_eq!(intent.language(), Language::Mixed);
    assert!(intent.confidence() >= 0.4);
    assert_eq!(intent.confidence(), 1.0);
    assert_eq!(intent.raw_text(), "phone unlock karo");
}

#[test]
fn test_gibberish_is_unknown() {
    let intent = parser().parse("asdkj qqq", None);
    assert!(intent.is_unknown());
    assert_eq!(intent.confidence(), 0.0);
    assert!(intent.entities().is_empty());
}

#[test]
fn test_empty_input() {
    let p = parser();
    assert_eq!(p.classify("", None), Err(ParseError::Empty));
    assert_eq!(p.classify("   \t ", None), Err(ParseError::Empty));
    let intent = p.parse("   ", None);
    assert!(intent.is_unknown());
    assert_eq!(intent.confidence(), 0.0);
}

#[test]
fn test_no_match_error() {
    assert_eq!(parser().classify("asdkj qqq", None), Err(ParseError::NoMatch));
}

#[test]
fn test_unlock_variants() {
    for utterance in ["unlock phone", "mobile unlock", "फोन अनलॉक करो", "Unlock the phone!"] {
        let intent = parser().parse(utterance, None);
        assert_eq!(intent.category(), IntentCategory::DeviceUnlock, "{}", utterance);
    }
}

#[test]
fn test_exit_variants() {
    for utterance in ["exit", "quit", "bye", "band karo"] {
        let intent = parser().parse(utterance, None);
        assert_eq!(intent.category(), IntentCategory::Exit, "{}", utterance);
        assert!(intent.confidence() > 0.5);
    }
}

#[test]
fn test_band_with_app_closes_app() {
    let intent = parser().parse("notepad band karo", None);
    assert_eq!(intent.category(), IntentCategory::AppClose);
    assert_eq!(text(&intent, "app_name").as_deref(), Some("notepad"));
}

#[test]
fn test_band_with_phone_locks_device() {
    let intent = parser().parse("phone band karo", None);
    assert_eq!(intent.category(), IntentCategory::DeviceLock);
}

#[test]
fn test_help_variants() {
    for utterance in ["help", "commands", "kya kar sakte", "what can you do"] {
        let intent = parser().parse(utterance, None);
        assert_eq!(intent.category(), IntentCategory::Help, "{}", utterance);
    }
}

#[test]
fn test_open_app_entities() {
    let intent = parser().parse("open notepad", None);
    assert_eq!(intent.category(), IntentCategory::AppOpen);
    assert_eq!(text(&intent, "app_name").as_deref(), Some("notepad"));
    assert_eq!(intent.language(), Language::Primary);

    let intent = parser().parse("notepad kholo", None);
    assert_eq!(intent.category(), IntentCategory::AppOpen);
    assert_eq!(intent.language(), Language::Mixed);
}

#[test]
fn test_case_insensitive() {
    let p = parser();
    let a = p.parse("OPEN NOTEPAD", None);
    let b = p.parse("OpEn NoTePaD", None);
    assert_eq!(a.category(), b.category());
    assert_eq!(a.entities(), b.entities());
}

#[test]
fn test_build_app() {
    let intent = parser().parse("build todo app", None);
    assert_eq!(intent.category(), IntentCategory::AppBuild);
    assert_eq!(text(&intent, "app_type").as_deref(), Some("todo"));
}

#[test]
fn test_workflow_alias() {
    let intent = parser().parse("run morning workflow", None);
    assert_eq!(intent.category(), IntentCategory::WorkflowRun);
    assert_eq!(text(&intent, "workflow_name").as_deref(), Some("morning_routine"));
}

#[test]
fn test_start_workflow_beats_open_app() {
    let intent = parser().parse("start night routine", None);
    assert_eq!(intent.category(), IntentCategory::WorkflowRun);
    assert_eq!(text(&intent, "workflow_name").as_deref(), Some("night_routine"));
}

#[test]
fn test_volume_direction_and_level() {
    let intent = parser().parse("volume up", None);
    assert_eq!(intent.category(), IntentCategory::VolumeSet);
    assert_eq!(text(&intent, "direction").as_deref(), Some("up"));

    let intent = parser().parse("awaaz kam karo", None);
    assert_eq!(text(&intent, "direction").as_deref(), Some("down"));

    let intent = parser().parse("set volume to 40%", None);
    assert_eq!(intent.entity("level").and_then(|v| v.as_number()), Some(40.0));
}

#[test]
fn test_create_folders_quantity() {
    let intent = parser().parse("create 5 folders", None);
    assert_eq!(intent.category(), IntentCategory::FileOrganize);
    assert_eq!(intent.entity("count").and_then(|v| v.as_number()), Some(5.0));
}

#[test]
fn test_organize_path() {
    let intent = parser().parse("organize files in ~/Downloads/old", None);
    assert_eq!(intent.category(), IntentCategory::FileOrganize);
    assert_eq!(
        intent.entity("path").and_then(|v| v.as_path()),
        Some(&PathBuf::from("~/Downloads/old"))
    );

    let intent = parser().parse("downloads saaf karo", None);
    assert_eq!(
        intent.entity("path").and_then(|v| v.as_path()),
        Some(&PathBuf::from("~/Downloads"))
    );
}

#[test]
fn test_note_free_text() {
    let intent = parser().parse("note likho doodh lena hai", None);
    assert_eq!(intent.category(), IntentCategory::NoteTake);
    assert_eq!(text(&intent, "text").as_deref(), Some("doodh lena"));
}

#[test]
fn test_note_without_text_is_not_a_note() {
    let intent = parser().parse("take note", None);
    assert_ne!(intent.category(), IntentCategory::NoteTake);
}

#[test]
fn test_battery_beats_status() {
    let intent = parser().parse("battery status", None);
    assert_eq!(intent.category(), IntentCategory::DeviceBattery);
}

#[test]
fn test_partial_match_lowers_confidence() {
    let p = parser();
    let exact = p.parse("exit", None);
    let partial = p.parse("maybe exit later", None);
    assert_eq!(partial.category(), IntentCategory::Exit);
    assert!(partial.confidence() < exact.confidence());
}

#[test]
fn test_below_threshold_is_ambiguous() {
    let config = ParserConfig {
        confidence_threshold: 0.9,
        ..Default::default()
    };
    let p = IntentParser::from_config(&config);
    match p.classify("maybe exit later", None) {
        Err(ParseError::Ambiguous { best, confidence }) => {
            assert_eq!(best, IntentCategory::Exit);
            assert!(confidence < 0.9);
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }
    let intent = p.parse("maybe exit later", None);
    assert!(intent.is_unknown());
    assert_eq!(intent.confidence(), 0.0);
}

fn tie_parser() -> IntentParser {
    IntentParser::with_patterns(
        vec![
            Pattern::new(IntentCategory::AppOpen).group(&["chalu"]),
            Pattern::new(IntentCategory::DeviceUnlock).group(&["chalu"]),
        ],
        ParserConfig::default(),
    )
}

#[test]
fn test_tie_without_hint_uses_category_rank() {
    let intent = tie_parser().parse("chalu xyz", None);
    assert_eq!(intent.category(), IntentCategory::AppOpen);
}

#[test]
fn test_hint_breaks_low_confidence_tie() {
    let hint = snapshot_with(&[
        IntentCategory::DeviceUnlock,
        IntentCategory::DeviceUnlock,
        IntentCategory::AppOpen,
    ]);
    let intent = tie_parser().parse("chalu xyz", Some(&hint));
    assert_eq!(intent.category(), IntentCategory::DeviceUnlock);
}

#[test]
fn test_hint_never_overrides_confident_match() {
    let hint = snapshot_with(&[IntentCategory::DeviceUnlock, IntentCategory::DeviceUnlock]);
    let intent = tie_parser().parse("chalu", Some(&hint));
    assert_eq!(intent.category(), IntentCategory::AppOpen);
}

#[test]
fn test_hint_never_overrides_more_specific_match() {
    let hint = snapshot_with(&[IntentCategory::DeviceLock; 5]);
    let intent = parser().parse("unlock phone", Some(&hint));
    assert_eq!(intent.category(), IntentCategory::DeviceUnlock);
}

#[test]
fn test_candidates_sorted_by_specificity() {
    let candidates = parser().candidates("start night routine");
    assert!(candidates.len() >= 2);
    assert_eq!(candidates[0].category, IntentCategory::WorkflowRun);
    assert!(candidates[0].specificity > candidates[1].specificity);
}

#[test]
fn test_detect_language() {
    let p = parser();
    assert_eq!(p.detect_language("open calculator"), Language::Primary);
    assert_eq!(p.detect_language("band karo"), Language::Secondary);
    assert_eq!(p.detect_language("screenshot lo"), Language::Mixed);
}

#[test]
fn test_confidence_always_in_range() {
    let p = parser();
    for utterance in [
        "exit exit exit",
        "please please open open camera",
        "volume",
        "expert mode backup my photos to ~/Backups",
        "लॉक",
    ] {
        let intent = p.parse(utterance, None);
        assert!((0.0..=1.0).contains(&intent.confidence()), "{}", utterance);
    }
}
