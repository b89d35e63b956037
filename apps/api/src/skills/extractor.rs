//! Skill Extractor — asks the model for categorized skills and parses its answer.
//!
//! Model output is not trusted to be JSON. Anything that does not decode into
//! an `ExtractedSkillSet` is treated as "no skills found": callers always get a
//! well-shaped set, never a parse error. Transport failures still propagate.

use tracing::{info, warn};

use crate::llm_client::{
    strip_json_fences, GenerationRequest, LlmError, TextGenerator, ANALYSIS_TEMPERATURE,
};
use crate::skills::models::ExtractedSkillSet;
use crate::skills::prompts::SKILL_EXTRACTION_SYSTEM;

/// Outcome of decoding one model answer.
#[derive(Debug, Clone, PartialEq)]
pub enum SkillParse {
    Parsed(ExtractedSkillSet),
    /// The raw text that failed to decode.
    Malformed(String),
}

impl SkillParse {
    /// Collapses to a skill set; `Malformed` becomes the empty set.
    pub fn into_skill_set(self) -> ExtractedSkillSet {
        match self {
            SkillParse::Parsed(set) => set,
            SkillParse::Malformed(raw) => {
                warn!(
                    "Model returned non-JSON skill data ({} chars), falling back to empty set",
                    raw.len()
                );
                ExtractedSkillSet::default()
            }
        }
    }
}

/// Decodes model output. Markdown code fences around the JSON are tolerated;
/// prose around it is not.
pub fn parse_skill_response(text: &str) -> SkillParse {
    match serde_json::from_str::<ExtractedSkillSet>(strip_json_fences(text)) {
        Ok(set) => SkillParse::Parsed(set),
        Err(_) => SkillParse::Malformed(text.to_string()),
    }
}

/// Extracts categorized skills from a job description.
///
/// The description is forwarded as-is, including when empty.
pub async fn extract_skills(
    generator: &dyn TextGenerator,
    job_description: &str,
) -> Result<ExtractedSkillSet, LlmError> {
    let request = GenerationRequest::new(job_description)
        .with_model(generator.default_model())
        .with_system(SKILL_EXTRACTION_SYSTEM)
        .with_temperature(ANALYSIS_TEMPERATURE);

    let response = generator.generate(&request).await?;
    let skills = parse_skill_response(&response).into_skill_set();

    if skills.is_empty() {
        info!("No skills extracted from job description");
    } else {
        info!(
            "Extracted skills: technical={}, soft={}, domain={}",
            skills.technical_skills.len(),
            skills.soft_skills.len(),
            skills.domain_knowledge.len()
        );
    }

    Ok(skills)
}
