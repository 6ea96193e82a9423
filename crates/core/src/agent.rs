//! Agent records: the stored personas whose profiles seed prompts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored agent.
///
/// Field names follow the persisted/wire format (`profileJSON`, `createdAt`,
/// `updatedAt`), so existing data files stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Generated unique identifier (UUID v4)
    pub id: String,

    /// Display name, never empty
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Free-form profile used as prompt context
    #[serde(
        rename = "profileJSON",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_json: Option<serde_json::Value>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAgent {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "profileJSON", default)]
    pub profile_json: Option<serde_json::Value>,
}

/// Partial update. Supplied fields overwrite, absent fields are retained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "profileJSON", default)]
    pub profile_json: Option<serde_json::Value>,
}

impl AgentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.profile_json.is_none()
    }
}

impl Agent {
    /// Build a fresh record with a new id and identical created/updated stamps.
    pub fn new(input: NewAgent) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            description: input.description,
            profile_json: input.profile_json,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge a patch into this record and refresh `updated_at`.
    pub fn apply(&mut self, patch: AgentPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(profile) = patch.profile_json {
            self.profile_json = Some(profile);
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Agent {
        Agent::new(NewAgent {
            name: "planner".into(),
            description: Some("plans things".into()),
            profile_json: Some(serde_json::json!({"level": "advanced"})),
        })
    }

    #[test]
    fn new_agent_has_matching_timestamps() {
        let agent = sample();
        assert!(!agent.id.is_empty());
        assert_eq!(agent.created_at, agent.updated_at);
    }

    #[test]
    fn apply_keeps_unspecified_fields() {
        let mut agent = sample();
        let before = agent.clone();

        agent.apply(AgentPatch {
            description: Some("x".into()),
            ..Default::default()
        });

        assert_eq!(agent.name, before.name);
        assert_eq!(agent.profile_json, before.profile_json);
        assert_eq!(agent.description.as_deref(), Some("x"));
        assert_eq!(agent.created_at, before.created_at);
        assert!(agent.updated_at >= before.updated_at);
    }

    #[test]
    fn wire_format_uses_camel_case_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("profileJSON").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn empty_patch_detected() {
        assert!(AgentPatch::default().is_empty());
        let patch = AgentPatch {
            profile_json: Some(serde_json::Value::Null),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
