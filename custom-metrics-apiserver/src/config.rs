use std::{collections::BTreeMap, fs::File, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsConfigError {
    #[error("Io error: {}", .0)]
    IoError(std::io::Error),
    #[error("Deserialization error: {}", .0)]
    DeserializationError(serde_yaml::Error),
    #[error("Series '{}' of '{}' {} is missing a value!", .0, .1, .2)]
    MissingValue(String, String, String),
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsConfig {
    pub series: Vec<MetricSeries>,
}

/// One metric value of one object, e.g. `http_requests` of pod `default/web-0`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricSeries {
    pub metric_name: String,
    /// plural resource name of the described object, e.g. `pods` or `nodes`
    pub resource: String,
    /// kind of the described object, e.g. `Pod`
    pub kind: Option<String>,
    /// empty for cluster scoped objects
    pub namespace: Option<String>,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: String,
    pub window_seconds: Option<i64>,
}

impl MetricsConfig {
    pub fn load(path: &Path) -> Result<Self, MetricsConfigError> {
        debug!("Used metrics config path: {path:?}");

        let file = File::open(path).map_err(MetricsConfigError::IoError)?;

        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, MetricsConfigError> {
        let config: MetricsConfig =
            serde_yaml::from_reader(reader).map_err(MetricsConfigError::DeserializationError)?;

        config.validated()
    }

    fn validated(self) -> Result<Self, MetricsConfigError> {
        if let Some(series) = self.series.iter().find(|series| series.value.is_empty()) {
            return Err(MetricsConfigError::MissingValue(
                series.metric_name.to_owned(),
                series.resource.to_owned(),
                series.name.to_owned(),
            ));
        }

        Ok(self)
    }
}
