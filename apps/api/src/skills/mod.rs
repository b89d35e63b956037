// Skill extraction: turns a pasted job description into three categorized skill lists.
// All model calls go through llm_client — no direct HTTP calls here.

pub mod extractor;
pub mod handlers;
pub mod models;
pub mod prompts;
