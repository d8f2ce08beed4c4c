//! Static stage prompt templates.

use crate::core::{StageIndex, STAGE_COUNT};

/// The fixed prompt and report title for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePrompt {
    /// Section title used in the report.
    pub title: &'static str,
    /// Instruction sent to the model.
    pub template: &'static str,
}

/// Prompts for stages 1, 2 and 3.
pub const STAGE_PROMPTS: [StagePrompt; STAGE_COUNT] = [
    StagePrompt {
        title: "System Overview",
        template: "Describe the overall system or machine in this image and identify its main \
                   mechanical component.",
    },
    StagePrompt {
        title: "Connection Analysis",
        template: "Focus on the connection points. Are there bolts, welds, or clamps?",
    },
    StagePrompt {
        title: "Surface Condition",
        template: "Describe the surface condition. Is there evidence of wear, corrosion, or damage?",
    },
];

/// The prompt for `stage`.
#[must_use]
pub fn stage_prompt(stage: StageIndex) -> &'static StagePrompt {
    &STAGE_PROMPTS[stage.position()]
}

/// Builds the full prompt text: the template followed by the context carry.
#[must_use]
pub fn build_prompt(stage: StageIndex, context_carry: &str) -> String {
    let template = stage_prompt(stage).template;
    let mut prompt = String::with_capacity(template.len() + context_carry.len());
    prompt.push_str(template);
    prompt.push_str(context_carry);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_stage_has_a_prompt() {
        for stage in StageIndex::all() {
            let prompt = stage_prompt(stage);
            assert!(!prompt.title.is_empty());
            assert!(prompt.template.ends_with(['.', '?']));
        }
    }

    #[test]
    fn test_build_prompt_appends_carry() {
        let prompt = build_prompt(StageIndex::LAST, " Context: x.");
        assert!(prompt.starts_with("Describe the surface condition."));
        assert!(prompt.ends_with(" Context: x."));
    }

    #[test]
    fn test_first_stage_without_carry() {
        assert_eq!(build_prompt(StageIndex::FIRST, ""), STAGE_PROMPTS[0].template);
    }
}
