use std::collections::BTreeMap;

use custom_metrics_apiserver_core::{
    custom_metrics::MetricValue, status::StatusError, CUSTOM_METRICS_GROUP,
};
use k8s_openapi::{
    api::core::v1::ObjectReference,
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::LabelSelector},
};
use log::trace;

use crate::config::{MetricSeries, MetricsConfig};

/// Objects a metric is requested for.
#[derive(Debug, Clone, Copy)]
pub struct MetricTarget<'a> {
    /// plural resource name, e.g. `pods`
    pub resource: &'a str,
    /// `None` for cluster scoped resources
    pub namespace: Option<&'a str>,
}

/// Equality based label selector (`app=web,tier==frontend`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EqualitySelector(BTreeMap<String, String>);

impl EqualitySelector {
    pub fn parse(raw: &str) -> Result<Self, StatusError> {
        let mut requirements = BTreeMap::new();

        for requirement in raw.split(',').map(str::trim).filter(|r| !r.is_empty()) {
            let (key, value) = requirement
                .split_once("==")
                .or_else(|| requirement.split_once('='))
                .filter(|(key, _)| !key.trim().is_empty() && !key.ends_with('!'))
                .ok_or_else(|| {
                    StatusError::bad_request(format!(
                        "unable to parse label selector requirement '{requirement}'"
                    ))
                })?;

            requirements.insert(key.trim().to_owned(), value.trim().to_owned());
        }

        Ok(Self(requirements))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }

    fn to_label_selector(&self) -> LabelSelector {
        LabelSelector {
            match_labels: Some(self.0.clone()),
            ..Default::default()
        }
    }
}

pub trait CustomMetricsProvider: Send + Sync {
    fn get_metric_by_name(
        &self,
        target: MetricTarget,
        name: &str,
        metric_name: &str,
    ) -> Result<MetricValue, StatusError>;

    fn get_metric_by_selector(
        &self,
        target: MetricTarget,
        selector: &EqualitySelector,
        metric_name: &str,
    ) -> Result<Vec<MetricValue>, StatusError>;
}

/// Serves the series listed in a [`MetricsConfig`].
pub struct StaticMetricsProvider {
    series: Vec<MetricSeries>,
}

impl StaticMetricsProvider {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            series: config.series,
        }
    }

    fn series_of<'a>(
        &'a self,
        target: MetricTarget<'a>,
        metric_name: &'a str,
    ) -> impl Iterator<Item = &'a MetricSeries> + 'a {
        self.series.iter().filter(move |series| {
            series.metric_name == metric_name
                && series.resource == target.resource
                && series.namespace.as_deref() == target.namespace
        })
    }

    fn has_metric(&self, resource: &str, metric_name: &str) -> bool {
        self.series
            .iter()
            .any(|series| series.metric_name == metric_name && series.resource == resource)
    }
}

impl CustomMetricsProvider for StaticMetricsProvider {
    fn get_metric_by_name(
        &self,
        target: MetricTarget,
        name: &str,
        metric_name: &str,
    ) -> Result<MetricValue, StatusError> {
        self.series_of(target, metric_name)
            .find(|series| series.name == name)
            .map(|series| to_metric_value(series, None))
            .ok_or_else(|| metric_not_found(metric_name, name))
    }

    fn get_metric_by_selector(
        &self,
        target: MetricTarget,
        selector: &EqualitySelector,
        metric_name: &str,
    ) -> Result<Vec<MetricValue>, StatusError> {
        if !self.has_metric(target.resource, metric_name) {
            return Err(metric_not_found(metric_name, "*"));
        }

        let label_selector = Some(selector)
            .filter(|selector| !selector.is_empty())
            .map(EqualitySelector::to_label_selector);
        let values = self
            .series_of(target, metric_name)
            .filter(|series| selector.matches(&series.labels))
            .map(|series| to_metric_value(series, label_selector.clone()))
            .collect::<Vec<_>>();

        trace!(
            "Selected {} '{metric_name}' series of {}",
            values.len(),
            target.resource
        );

        Ok(values)
    }
}

fn metric_not_found(metric_name: &str, name: &str) -> StatusError {
    StatusError::not_found(&format!("{metric_name}.{CUSTOM_METRICS_GROUP}"), name)
}

fn to_metric_value(series: &MetricSeries, selector: Option<LabelSelector>) -> MetricValue {
    let described_object = ObjectReference {
        kind: series.kind.clone(),
        name: Some(series.name.to_owned()),
        namespace: series.namespace.clone(),
        ..Default::default()
    };

    let mut value = MetricValue::new(
        described_object,
        &series.metric_name,
        Quantity(series.value.to_owned()),
    );
    value.window_seconds = series.window_seconds;
    value.selector = selector;

    value
}
