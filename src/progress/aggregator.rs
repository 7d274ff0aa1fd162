//! Progress aggregation: turns raw module/section completion into the single
//! `total_progress` percentage and applies section toggles to a record.

use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{
    AssessmentScore, ModuleId, ModuleMap, ModuleProgress, ProgressRecord, SectionUpdate,
};

/// Share of the total carried by module completion.
pub const MODULE_WEIGHT: f64 = 60.0;
/// Share of the total carried by completed sections.
pub const SECTION_WEIGHT: f64 = 40.0;
/// Fixed approximation of sub-sections across the curriculum; not derived
/// from the actual content.
pub const SECTION_DENOMINATOR: usize = 20;

/// `min(100, completed_modules/6 * 60 + min(sections, 20)/20 * 40)`.
///
/// Modules and sections are counted independently, so finishing every module
/// with no sections yields 60, not 100.
pub fn total_progress(completed_sections: usize, modules: &ModuleMap) -> f64 {
    let completed_modules = modules.values().filter(|m| m.completed).count();
    let module_weight = (completed_modules as f64 / ModuleId::ALL.len() as f64) * MODULE_WEIGHT;
    let section_weight = (completed_sections.min(SECTION_DENOMINATOR) as f64
        / SECTION_DENOMINATOR as f64)
        * SECTION_WEIGHT;
    (module_weight + section_weight).min(100.0)
}

pub fn default_modules() -> ModuleMap {
    ModuleId::ALL
        .into_iter()
        .map(|m| (m, ModuleProgress::default()))
        .collect()
}

impl ProgressRecord {
    /// All six modules incomplete, no sections, no scores.
    pub fn new_default(user_id: Uuid, now: OffsetDateTime) -> Self {
        Self {
            user_id,
            completed_sections: Vec::new(),
            module_progress: default_modules(),
            assessment_scores: Vec::new(),
            total_progress: 0.0,
            last_accessed_module: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Restore any module key missing from a stored record.
    pub fn ensure_all_modules(&mut self) {
        for module in ModuleId::ALL {
            self.module_progress.entry(module).or_default();
        }
    }

    pub fn recompute_total(&mut self) {
        self.total_progress = total_progress(self.completed_sections.len(), &self.module_progress);
    }

    /// Toggle a section and, if `module_id` is a known module, its completion.
    ///
    /// Unknown module ids still become `last_accessed_module` but leave the
    /// module map untouched.
    pub fn apply_section_update(&mut self, update: &SectionUpdate, now: OffsetDateTime) {
        let present = self
            .completed_sections
            .iter()
            .position(|s| *s == update.section_id);
        match (update.completed, present) {
            (true, None) => self.completed_sections.push(update.section_id.clone()),
            (false, Some(idx)) => {
                self.completed_sections.remove(idx);
            }
            _ => {}
        }

        if let Ok(module) = update.module_id.parse::<ModuleId>() {
            let entry = self.module_progress.entry(module).or_default();
            entry.completed = update.completed;
            entry.completed_at = update.completed.then_some(now);
        }

        self.recompute_total();
        self.last_accessed_module = Some(update.module_id.clone());
        self.updated_at = now;
    }

    /// Append-only; resubmitting an assessment adds another entry.
    pub fn push_assessment(&mut self, score: AssessmentScore, now: OffsetDateTime) {
        self.assessment_scores.push(score);
        self.updated_at = now;
    }
}
