//! Intent types produced by the parser and consumed by handlers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Closed set of intent categories.
///
/// Categories carry an explicit rank used to break ties between equally
/// specific parse candidates; lower rank wins. The rank is assigned in
/// [`IntentCategory::rank`] and does not depend on declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Exit,
    Help,
    Status,
    AppOpen,
    AppClose,
    AppBuild,
    WorkflowRun,
    PatternLearn,
    PatternExecute,
    DeviceUnlock,
    DeviceLock,
    DeviceScreenshot,
    DeviceBattery,
    VolumeSet,
    FileOrganize,
    NoteTake,
    ExpertTask,
    Unknown,
}

/// Coarse grouping of categories, used for default priorities and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryClass {
    System,
    Application,
    Device,
    Generic,
    Unknown,
}

impl IntentCategory {
    /// Every category, in rank order.
    pub const ALL: [IntentCategory; 18] = [
        IntentCategory::Exit,
        IntentCategory::Help,
        IntentCategory::Status,
        IntentCategory::AppOpen,
        IntentCategory::AppClose,
        IntentCategory::AppBuild,
        IntentCategory::WorkflowRun,
        IntentCategory::PatternExecute,
        IntentCategory::PatternLearn,
        IntentCategory::DeviceUnlock,
        IntentCategory::DeviceLock,
        IntentCategory::DeviceScreenshot,
        IntentCategory::DeviceBattery,
        IntentCategory::VolumeSet,
        IntentCategory::FileOrganize,
        IntentCategory::NoteTake,
        IntentCategory::ExpertTask,
        IntentCategory::Unknown,
    ];

    /// Tie-break rank. System commands outrank application commands, which
    /// outrank device commands, which outrank generic ones.
    pub fn rank(self) -> u8 {
        match self {
            IntentCategory::Exit => 0,
            IntentCategory::Help => 1,
            IntentCategory::Status => 2,
            IntentCategory::AppOpen => 10,
            IntentCategory::AppClose => 11,
            IntentCategory::AppBuild => 12,
            IntentCategory::WorkflowRun => 13,
            IntentCategory::PatternExecute => 14,
            IntentCategory::PatternLearn => 15,
            IntentCategory::DeviceUnlock => 20,
            IntentCategory::DeviceLock => 21,
            IntentCategory::DeviceScreenshot => 22,
            IntentCategory::DeviceBattery => 23,
            IntentCategory::VolumeSet => 24,
            IntentCategory::FileOrganize => 30,
            IntentCategory::NoteTake => 31,
            IntentCategory::ExpertTask => 32,
            IntentCategory::Unknown => u8::MAX,
        }
    }

    pub fn class(self) -> CategoryClass {
        match self {
            IntentCategory::Exit | IntentCategory::Help | IntentCategory::Status => {
                CategoryClass::System
            }
            IntentCategory::AppOpen
            | IntentCategory::AppClose
            | IntentCategory::AppBuild
            | IntentCategory::WorkflowRun
            | IntentCategory::PatternLearn
            | IntentCategory::PatternExecute => CategoryClass::Application,
            IntentCategory::DeviceUnlock
            | IntentCategory::DeviceLock
            | IntentCategory::DeviceScreenshot
            | IntentCategory::DeviceBattery
            | IntentCategory::VolumeSet => CategoryClass::Device,
            IntentCategory::FileOrganize
            | IntentCategory::NoteTake
            | IntentCategory::ExpertTask => CategoryClass::Generic,
            IntentCategory::Unknown => CategoryClass::Unknown,
        }
    }

    /// Capability a category routes to when no routing override exists.
    pub fn default_capability(self) -> &'static str {
        match self {
            IntentCategory::Exit
            | IntentCategory::Help
            | IntentCategory::Status
            | IntentCategory::Unknown => "system",
            IntentCategory::AppOpen | IntentCategory::AppClose => "app_control",
            IntentCategory::AppBuild => "app_builder",
            IntentCategory::WorkflowRun => "workflow_engine",
            IntentCategory::PatternLearn | IntentCategory::PatternExecute => "pattern_engine",
            IntentCategory::DeviceUnlock
            | IntentCategory::DeviceLock
            | IntentCategory::DeviceScreenshot
            | IntentCategory::DeviceBattery
            | IntentCategory::VolumeSet => "device_control",
            IntentCategory::FileOrganize => "file_manager",
            IntentCategory::NoteTake => "notes",
            IntentCategory::ExpertTask => "expert_automation",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IntentCategory::Exit => "exit",
            IntentCategory::Help => "help",
            IntentCategory::Status => "status",
            IntentCategory::AppOpen => "app_open",
            IntentCategory::AppClose => "app_close",
            IntentCategory::AppBuild => "app_build",
            IntentCategory::WorkflowRun => "workflow_run",
            IntentCategory::PatternLearn => "pattern_learn",
            IntentCategory::PatternExecute => "pattern_execute",
            IntentCategory::DeviceUnlock => "device_unlock",
            IntentCategory::DeviceLock => "device_lock",
            IntentCategory::DeviceScreenshot => "device_screenshot",
            IntentCategory::DeviceBattery => "device_battery",
            IntentCategory::VolumeSet => "volume_set",
            IntentCategory::FileOrganize => "file_organize",
            IntentCategory::NoteTake => "note_take",
            IntentCategory::ExpertTask => "expert_task",
            IntentCategory::Unknown => "unknown",
        }
    }

    pub fn is_unknown(self) -> bool {
        self == IntentCategory::Unknown
    }
}

impl PartialOrd for IntentCategory {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IntentCategory {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntentCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown intent category: {}", s))
    }
}

/// Language an utterance was written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    Primary,
    /// Hindi, in Devanagari or romanized script.
    Secondary,
    /// Both languages in one utterance.
    Mixed,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Primary => "primary",
            Language::Secondary => "secondary",
            Language::Mixed => "mixed",
        };
        f.write_str(s)
    }
}

/// Typed value extracted from an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EntityValue {
    Text(String),
    Number(f64),
    Path(PathBuf),
}

impl EntityValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EntityValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            EntityValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathBuf> {
        match self {
            EntityValue::Path(p) => Some(p),
            _ => None,
        }
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityValue::Text(s) => f.write_str(s),
            EntityValue::Number(n) => write!(f, "{}", n),
            EntityValue::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Structured meaning of one utterance. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    category: IntentCategory,
    entities: BTreeMap<String, EntityValue>,
    confidence: f32,
    language: Language,
    raw_text: String,
}

impl Intent {
    /// Build an intent. Confidence is clamped into `[0, 1]`.
    pub fn new(
        category: IntentCategory,
        entities: BTreeMap<String, EntityValue>,
        confidence: f32,
        language: Language,
        raw_text: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            category,
            entities,
            confidence,
            language,
            raw_text: raw_text.into(),
        }
    }

    /// Fallback intent with no entities and zero confidence.
    pub fn unknown(raw_text: impl Into<String>, language: Language) -> Self {
        Self::new(
            IntentCategory::Unknown,
            BTreeMap::new(),
            0.0,
            language,
            raw_text,
        )
    }

    pub fn category(&self) -> IntentCategory {
        self.category
    }

    pub fn entities(&self) -> &BTreeMap<String, EntityValue> {
        &self.entities
    }

    pub fn entity(&self, name: &str) -> Option<&EntityValue> {
        self.entities.get(name)
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn is_unknown(&self) -> bool {
        self.category.is_unknown()
    }
}

#[cfg(test)]
#[path = "intent_tests.rs"]
mod tests;
