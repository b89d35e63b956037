use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// One of the three fixed skill groupings used throughout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    Technical,
    Soft,
    Domain,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 3] = [
        SkillCategory::Technical,
        SkillCategory::Soft,
        SkillCategory::Domain,
    ];

    /// Prefix of the composite selection key, e.g. `tech_Python`.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            SkillCategory::Technical => "tech",
            SkillCategory::Soft => "soft",
            SkillCategory::Domain => "domain",
        }
    }

    /// Composite identity of a skill within a session: category + skill name.
    pub fn selection_key(&self, skill: &str) -> String {
        format!("{}_{}", self.key_prefix(), skill)
    }
}

/// A single extracted skill and where the job description mentions it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub skill: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context: String,
}

/// Model output, categorized. All three keys are always present; any
/// category the model left out or sent as `null` deserializes as an empty list.
/// Entries that do not decode (e.g. no `skill` name) are dropped individually.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedSkillSet {
    #[serde(deserialize_with = "lenient_entries")]
    pub technical_skills: Vec<SkillEntry>,
    #[serde(deserialize_with = "lenient_entries")]
    pub soft_skills: Vec<SkillEntry>,
    #[serde(deserialize_with = "lenient_entries")]
    pub domain_knowledge: Vec<SkillEntry>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A category must be a list (or `null`); anything else fails the whole decode.
fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<SkillEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<SkillEntry>(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Dropping undecodable skill entry: {e}");
                None
            }
        })
        .collect())
}

impl ExtractedSkillSet {
    pub fn entries(&self, category: SkillCategory) -> &[SkillEntry] {
        match category {
            SkillCategory::Technical => &self.technical_skills,
            SkillCategory::Soft => &self.soft_skills,
            SkillCategory::Domain => &self.domain_knowledge,
        }
    }

    /// Exact, case-sensitive lookup by skill name within a category.
    pub fn find(&self, category: SkillCategory, skill: &str) -> Option<&SkillEntry> {
        self.entries(category).iter().find(|e| e.skill == skill)
    }

    pub fn total(&self) -> usize {
        SkillCategory::ALL
            .iter()
            .map(|c| self.entries(*c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// A skill the user marked as possessed, with their own notes.
/// Lives only in session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedSkillAnnotation {
    pub skill: String,
    pub category: SkillCategory,
    pub context: String,
    pub notes: String,
    pub selected_at: DateTime<Utc>,
}
