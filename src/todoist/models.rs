use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A project as returned by the service. Read-only on our side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "id_from_value")]
    pub id: String,
    pub name: String,
}

/// A task record in the service's own shape.
///
/// The id is kept as raw JSON because older API revisions sent numbers;
/// `sync` turns records into [`Task`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Value,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_completed: Option<bool>,
    #[serde(default)]
    pub project_id: Option<Value>,
}

/// The local task shape the list renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

impl Task {
    pub fn symbol(&self) -> &'static str {
        if self.completed { "(✓)" } else { "( )" }
    }
}

impl From<&TaskRecord> for Task {
    fn from(record: &TaskRecord) -> Self {
        Task {
            id: stringify_id(&record.id),
            text: record.content.clone(),
            completed: record.is_completed.unwrap_or(false),
        }
    }
}

/// Render a JSON id as the string the rest of the app keys on.
pub fn stringify_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn id_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(stringify_id(&value))
}
