//! Response shapes
//!
//! Tracking entities flattened into the plain mappings the API returns.
//! Field names and nesting are part of the API contract consumed by the
//! dashboard and by existing clients.

use serde::Serialize;

use crate::tracking::{Experiment, ModelVersion, RegisteredModel, Run, Tag};

#[derive(Debug, Clone, Serialize)]
pub struct KeyValue<V> {
    pub key: String,
    pub value: V,
}

fn tags_view(tags: &[Tag]) -> Vec<KeyValue<String>> {
    tags.iter()
        .map(|t| KeyValue {
            key: t.key.clone(),
            value: t.value.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentSummary {
    pub id: String,
    pub name: String,
    pub lifecycle_stage: String,
}

impl From<&Experiment> for ExperimentSummary {
    fn from(e: &Experiment) -> Self {
        Self {
            id: e.experiment_id.clone(),
            name: e.name.clone(),
            lifecycle_stage: e.lifecycle_stage.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentDetail {
    pub id: String,
    pub name: String,
    pub lifecycle_stage: String,
    pub artifact_location: Option<String>,
}

impl From<&Experiment> for ExperimentDetail {
    fn from(e: &Experiment) -> Self {
        Self {
            id: e.experiment_id.clone(),
            name: e.name.clone(),
            lifecycle_stage: e.lifecycle_stage.clone(),
            artifact_location: e.artifact_location.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunInfoView {
    pub run_id: String,
    pub run_name: Option<String>,
    pub experiment_id: String,
    pub status: String,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub artifact_uri: Option<String>,
    pub lifecycle_stage: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunDataView {
    pub metrics: Vec<KeyValue<f64>>,
    pub params: Vec<KeyValue<String>>,
    pub tags: Vec<KeyValue<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunView {
    pub info: RunInfoView,
    pub data: RunDataView,
}

impl From<&Run> for RunView {
    fn from(run: &Run) -> Self {
        let info = &run.info;
        Self {
            info: RunInfoView {
                run_id: info.run_id.clone(),
                run_name: info.run_name.clone(),
                experiment_id: info.experiment_id.clone(),
                status: info.status.to_string(),
                start_time: info.start_time,
                end_time: info.end_time,
                artifact_uri: info.artifact_uri.clone(),
                lifecycle_stage: info.lifecycle_stage.clone(),
            },
            data: RunDataView {
                metrics: run
                    .data
                    .metrics
                    .iter()
                    .map(|m| KeyValue {
                        key: m.key.clone(),
                        value: m.value,
                    })
                    .collect(),
                params: run
                    .data
                    .params
                    .iter()
                    .map(|p| KeyValue {
                        key: p.key.clone(),
                        value: p.value.clone(),
                    })
                    .collect(),
                tags: tags_view(&run.data.tags),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelVersionView {
    pub name: String,
    pub version: String,
    pub creation_timestamp: Option<i64>,
    pub last_updated_timestamp: Option<i64>,
    pub current_stage: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub run_id: Option<String>,
    pub status: Option<String>,
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<KeyValue<String>>>,
}

impl ModelVersionView {
    pub fn with_tags(mv: &ModelVersion) -> Self {
        Self {
            tags: Some(tags_view(&mv.tags)),
            ..Self::from(mv)
        }
    }
}

impl From<&ModelVersion> for ModelVersionView {
    fn from(mv: &ModelVersion) -> Self {
        Self {
            name: mv.name.clone(),
            version: mv.version.clone(),
            creation_timestamp: mv.creation_timestamp,
            last_updated_timestamp: mv.last_updated_timestamp,
            current_stage: mv.current_stage.clone(),
            description: mv.description.clone(),
            source: mv.source.clone(),
            run_id: mv.run_id.clone(),
            status: mv.status.clone(),
            status_message: mv.status_message.clone(),
            tags: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredModelView {
    pub name: String,
    pub creation_timestamp: Option<i64>,
    pub last_updated_timestamp: Option<i64>,
    pub description: Option<String>,
    pub latest_versions: Vec<ModelVersionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<KeyValue<String>>>,
}

impl RegisteredModelView {
    pub fn with_tags(model: &RegisteredModel) -> Self {
        Self {
            tags: Some(tags_view(&model.tags)),
            ..Self::from(model)
        }
    }
}

impl From<&RegisteredModel> for RegisteredModelView {
    fn from(model: &RegisteredModel) -> Self {
        Self {
            name: model.name.clone(),
            creation_timestamp: model.creation_timestamp,
            last_updated_timestamp: model.last_updated_timestamp,
            description: model.description.clone(),
            latest_versions: model.latest_versions.iter().map(ModelVersionView::from).collect(),
            tags: None,
        }
    }
}
