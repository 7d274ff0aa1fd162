use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The six fixed curriculum modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleId {
    PmBasics,
    Discovery,
    ProductSense,
    Metrics,
    AiEra,
    Tools,
}

impl ModuleId {
    pub const ALL: [ModuleId; 6] = [
        ModuleId::PmBasics,
        ModuleId::Discovery,
        ModuleId::ProductSense,
        ModuleId::Metrics,
        ModuleId::AiEra,
        ModuleId::Tools,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleId::PmBasics => "pm-basics",
            ModuleId::Discovery => "discovery",
            ModuleId::ProductSense => "product-sense",
            ModuleId::Metrics => "metrics",
            ModuleId::AiEra => "ai-era",
            ModuleId::Tools => "tools",
        }
    }
}

impl FromStr for ModuleId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleId::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub completed: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentScore {
    pub assessment_id: String,
    pub score: f64,
    pub answers: serde_json::Map<String, serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

pub type ModuleMap = BTreeMap<ModuleId, ModuleProgress>;

/// One progress record per user; `total_progress` is always derived.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub user_id: Uuid,
    pub completed_sections: Vec<String>,
    pub module_progress: ModuleMap,
    pub assessment_scores: Vec<AssessmentScore>,
    pub total_progress: f64,
    pub last_accessed_module: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// A section completion toggle as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionUpdate {
    pub section_id: String,
    pub module_id: String,
    pub completed: bool,
}
