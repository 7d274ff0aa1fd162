/// RICE prioritisation score: `reach * impact * (confidence / 100) / effort`.
///
/// Zero effort is a sentinel and scores 0 rather than dividing by zero.
pub fn rice_score(reach: f64, impact: f64, confidence: f64, effort: f64) -> f64 {
    if effort == 0.0 {
        return 0.0;
    }
    reach * impact * (confidence / 100.0) / effort
}

pub fn format_story(story: &str) -> String {
    format!(
        "As a [user type], I want to {} so that [benefit].",
        story.to_lowercase()
    )
}
