//! Category pattern table.

use shivai_protocols::IntentCategory;

use crate::slots::{SlotKind, SlotRule};

/// One way of expressing a category.
///
/// Every trigger group must match (each group lists alternative words or
/// phrases). Boost words are optional and only raise specificity. Slots
/// extract entities from whatever the triggers left over.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub(crate) category: IntentCategory,
    pub(crate) groups: Vec<Vec<Vec<String>>>,
    pub(crate) boosts: Vec<String>,
    pub(crate) slots: Vec<SlotRule>,
    pub(crate) standalone: bool,
}

impl Pattern {
    pub fn new(category: IntentCategory) -> Self {
        Self {
            category,
            groups: Vec::new(),
            boosts: Vec::new(),
            slots: Vec::new(),
            standalone: false,
        }
    }

    /// Add a required group of alternatives. Longer phrases are tried first.
    pub fn group(mut self, alternatives: &[&str]) -> Self {
        let mut alts: Vec<Vec<String>> = alternatives
            .iter()
            .map(|a| a.split_whitespace().map(str::to_string).collect())
            .filter(|a: &Vec<String>| !a.is_empty())
            .collect();
        alts.sort_by(|a, b| b.len().cmp(&a.len()));
        self.groups.push(alts);
        self
    }

    pub fn boost(mut self, words: &[&str]) -> Self {
        self.boosts.extend(words.iter().map(|w| w.to_string()));
        self
    }

    pub fn slot(mut self, rule: SlotRule) -> Self {
        self.slots.push(rule);
        self
    }

    /// Only match when nothing but filler words remains after the triggers.
    pub fn standalone(mut self) -> Self {
        self.standalone = true;
        self
    }

    pub fn category(&self) -> IntentCategory {
        self.category
    }

    /// Every trigger and boost word.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flatten()
            .flatten()
            .chain(self.boosts.iter())
            .map(String::as_str)
    }
}

const DEVICE: &[&str] = &["phone", "mobile", "screen", "device"];

const DIRECTIONS: &[(&str, &str)] = &[
    ("up", "up"),
    ("increase", "up"),
    ("louder", "up"),
    ("badhao", "up"),
    ("zyada", "up"),
    ("tez", "up"),
    ("down", "down"),
    ("decrease", "down"),
    ("lower", "down"),
    ("ghatao", "down"),
    ("kam", "down"),
    ("dheere", "down"),
    ("mute", "mute"),
    ("chup", "mute"),
];

const WORKFLOW_ALIASES: &[(&str, &str)] = &[
    ("morning", "morning_routine"),
    ("subah", "morning_routine"),
    ("night", "night_routine"),
    ("raat", "night_routine"),
];

/// The built-in English/Hindi pattern table.
///
/// Table order only matters as the final tie-break; category rank decides
/// between equally specific matches.
pub fn builtin_patterns() -> Vec<Pattern> {
    use IntentCategory::*;

    vec![
        Pattern::new(Exit).group(&["exit", "quit", "bye", "goodbye", "alvida"]),
        Pattern::new(Exit).group(&["band"]).standalone(),
        Pattern::new(Help).group(&[
            "help",
            "madad",
            "commands",
            "kya kar sakte",
            "what can you do",
        ]),
        Pattern::new(Status)
            .group(&["status", "sthiti", "stats", "haal"])
            .boost(&["check", "show"]),
        Pattern::new(DeviceUnlock).group(&["unlock"]).boost(DEVICE),
        Pattern::new(DeviceLock).group(&["lock"]).boost(DEVICE),
        Pattern::new(DeviceLock)
            .group(DEVICE)
            .group(&["band", "off"]),
        Pattern::new(DeviceScreenshot)
            .group(&["screenshot", "ss", "screen shot"])
            .boost(&["take", "capture", "lo", "le", "phone", "mobile"]),
        Pattern::new(DeviceBattery)
            .group(&["battery", "charge", "charging"])
            .boost(&[
                "status", "level", "kitna", "kitni", "check", "how", "much", "left", "phone",
                "mobile",
            ]),
        Pattern::new(VolumeSet)
            .group(&["volume", "awaaz", "sound"])
            .boost(&["set"])
            .slot(SlotRule::optional("direction", SlotKind::Keyword(DIRECTIONS)))
            .slot(SlotRule::optional("level", SlotKind::Quantity)),
        Pattern::new(AppOpen)
            .group(&["open", "launch", "start", "kholo", "khol", "chalao", "chalu"])
            .boost(&["app", "application"])
            .slot(SlotRule::required("app_name", SlotKind::AppName)),
        Pattern::new(AppClose)
            .group(&["close", "band", "bund"])
            .boost(&["app", "application"])
            .slot(SlotRule::required("app_name", SlotKind::AppName)),
        Pattern::new(AppBuild)
            .group(&["build", "banao", "bana", "develop"])
            .boost(&["app", "application"])
            .slot(SlotRule::required("app_type", SlotKind::Identifier(&[]))),
        Pattern::new(WorkflowRun)
            .group(&["run", "chalao", "start", "execute"])
            .group(&["workflow", "routine"])
            .slot(SlotRule::required(
                "workflow_name",
                SlotKind::Identifier(WORKFLOW_ALIASES),
            )),
        Pattern::new(PatternLearn)
            .group(&["learn", "sikho", "record", "yaad rakho"])
            .group(&["pattern"])
            .slot(SlotRule::required("pattern_name", SlotKind::Identifier(&[]))),
        Pattern::new(PatternExecute)
            .group(&["run", "chalao", "execute", "repeat"])
            .group(&["pattern"])
            .slot(SlotRule::required("pattern_name", SlotKind::Identifier(&[]))),
        Pattern::new(FileOrganize)
            .group(&["organize", "organise", "arrange", "sort", "saaf", "clean"])
            .boost(&["files", "file", "folder", "folders"])
            .slot(SlotRule::optional("path", SlotKind::Path)),
        Pattern::new(FileOrganize)
            .group(&["create", "make", "banao"])
            .group(&["folder", "folders"])
            .slot(SlotRule::optional("count", SlotKind::Quantity)),
        Pattern::new(NoteTake)
            .group(&["note", "notes", "likho", "jot", "remember"])
            .boost(&["take", "write", "likho", "down"])
            .slot(SlotRule::required("text", SlotKind::FreeText)),
        Pattern::new(ExpertTask)
            .group(&["expert"])
            .boost(&["mode", "task"])
            .slot(SlotRule::required("task", SlotKind::FreeText)),
    ]
}
