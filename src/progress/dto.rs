use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::progress::repo_types::{AssessmentScore, ModuleMap, ProgressRecord, SectionUpdate};

#[derive(Debug, Deserialize, Validate)]
pub struct SectionUpdateRequest {
    #[validate(length(min = 1, message = "section_id is required"))]
    pub section_id: String,
    #[validate(length(min = 1, message = "module_id is required"))]
    pub module_id: String,
    pub completed: bool,
}

impl From<SectionUpdateRequest> for SectionUpdate {
    fn from(req: SectionUpdateRequest) -> Self {
        Self {
            section_id: req.section_id,
            module_id: req.module_id,
            completed: req.completed,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssessmentRequest {
    #[validate(length(min = 1, message = "assessment_id is required"))]
    pub assessment_id: String,
    #[serde(default)]
    pub answers: serde_json::Map<String, serde_json::Value>,
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub completed_sections: Vec<String>,
    pub module_progress: ModuleMap,
    pub assessment_scores: Vec<AssessmentScore>,
    pub total_progress: f64,
    pub last_accessed_module: Option<String>,
}

impl From<ProgressRecord> for ProgressResponse {
    fn from(record: ProgressRecord) -> Self {
        Self {
            completed_sections: record.completed_sections,
            module_progress: record.module_progress,
            assessment_scores: record.assessment_scores,
            total_progress: record.total_progress,
            last_accessed_module: record.last_accessed_module,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SectionUpdateResponse {
    pub message: String,
    pub total_progress: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub message: String,
    pub score: f64,
}
