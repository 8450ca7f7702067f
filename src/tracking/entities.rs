//! Tracking service entities
//!
//! Typed mirrors of the objects returned by the MLflow REST API. Unknown
//! fields are ignored and everything the server may omit is optional, so the
//! same types decode responses from any recent tracking server version.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::error::TrackingError;

/// Which lifecycle stages a search should include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewType {
    ActiveOnly,
    DeletedOnly,
    All,
}

impl ViewType {
    /// Whether an entity in `lifecycle_stage` is visible under this view
    pub fn includes(&self, lifecycle_stage: &str) -> bool {
        match self {
            ViewType::All => true,
            ViewType::ActiveOnly => lifecycle_stage == LIFECYCLE_ACTIVE,
            ViewType::DeletedOnly => lifecycle_stage == LIFECYCLE_DELETED,
        }
    }
}

pub const LIFECYCLE_ACTIVE: &str = "active";
pub const LIFECYCLE_DELETED: &str = "deleted";

/// A key/value tag attached to an experiment, run, model or version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    #[serde(default)]
    pub artifact_location: Option<String>,
    #[serde(default = "default_lifecycle")]
    pub lifecycle_stage: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub creation_time: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub last_update_time: Option<i64>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Run status as reported by the tracking server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Scheduled,
    Finished,
    Failed,
    Killed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Scheduled => "SCHEDULED",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Killed => "KILLED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    #[serde(default)]
    pub run_name: Option<String>,
    pub experiment_id: String,
    pub status: RunStatus,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub start_time: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub artifact_uri: Option<String>,
    #[serde(default = "default_lifecycle")]
    pub lifecycle_stage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    pub value: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub step: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunData {
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub info: RunInfo,
    #[serde(default)]
    pub data: RunData,
}

/// An entry in a run's artifact tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub file_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub creation_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub last_updated_timestamp: Option<i64>,
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub creation_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub last_updated_timestamp: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub latest_versions: Vec<ModelVersion>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Registry lifecycle label of a model version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelStage {
    None,
    Staging,
    Production,
    Archived,
}

impl ModelStage {
    pub const ALL: [ModelStage; 4] = [
        ModelStage::None,
        ModelStage::Staging,
        ModelStage::Production,
        ModelStage::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelStage::None => "None",
            ModelStage::Staging => "Staging",
            ModelStage::Production => "Production",
            ModelStage::Archived => "Archived",
        }
    }
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelStage {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                TrackingError::InvalidArgument(format!(
                    "Invalid Model Version stage: {}. Value must be one of None, Staging, Production, Archived.",
                    s
                ))
            })
    }
}

fn default_lifecycle() -> String {
    LIFECYCLE_ACTIVE.to_string()
}

/// Accept int64 fields encoded either as JSON numbers or as strings
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(v)) => Ok(Some(v)),
        Some(Raw::Float(v)) => Ok(Some(v as i64)),
        Some(Raw::Text(s)) if s.is_empty() => Ok(None),
        Some(Raw::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(v) => v.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_parse_is_case_insensitive() {
        assert_eq!("production".parse::<ModelStage>().unwrap(), ModelStage::Production);
        assert_eq!(" Staging ".parse::<ModelStage>().unwrap(), ModelStage::Staging);
        assert_eq!("NONE".parse::<ModelStage>().unwrap(), ModelStage::None);
        assert!("Live".parse::<ModelStage>().is_err());
    }

    #[test]
    fn test_view_type_filtering() {
        assert!(ViewType::All.includes("deleted"));
        assert!(ViewType::ActiveOnly.includes("active"));
        assert!(!ViewType::ActiveOnly.includes("deleted"));
        assert!(ViewType::DeletedOnly.includes("deleted"));
    }

    #[test]
    fn test_model_version_accepts_numeric_fields_as_strings() {
        let mv: ModelVersion = serde_json::from_value(serde_json::json!({
            "name": "churn",
            "version": 3,
            "creation_timestamp": "1700000000000",
            "current_stage": "Staging",
            "run_id": "abc"
        }))
        .unwrap();
        assert_eq!(mv.version, "3");
        assert_eq!(mv.creation_timestamp, Some(1_700_000_000_000));
        assert_eq!(mv.last_updated_timestamp, None);
        assert!(mv.tags.is_empty());
    }

    #[test]
    fn test_run_decodes_mlflow_payload() {
        let run: Run = serde_json::from_value(serde_json::json!({
            "info": {
                "run_id": "r1",
                "run_uuid": "r1",
                "run_name": "baseline",
                "experiment_id": "0",
                "user_id": "alice",
                "status": "FINISHED",
                "start_time": 10,
                "end_time": 20,
                "artifact_uri": "mlflow-artifacts:/0/r1/artifacts",
                "lifecycle_stage": "active"
            },
            "data": {
                "metrics": [{"key": "acc", "value": 0.9, "timestamp": 11, "step": 0}],
                "params": [{"key": "lr", "value": "0.1"}]
            }
        }))
        .unwrap();
        assert_eq!(run.info.status, RunStatus::Finished);
        assert_eq!(run.data.metrics[0].value, 0.9);
        assert!(run.data.tags.is_empty());
    }
}
