// Shared prompt constants for direct model-client calls.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt for the general job description breakdown.
pub const ANALYZE_JD_SYSTEM: &str = "\
    You are an expert resume consultant. Analyze the following job description \
    and extract key information including:
- Required technical skills
- Required soft skills
- Years of experience
- Education requirements
- Key responsibilities

Format the response as a JSON object.";
