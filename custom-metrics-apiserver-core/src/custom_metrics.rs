use chrono::Utc;
use k8s_openapi::{
    api::core::v1::ObjectReference,
    apimachinery::pkg::{
        api::resource::Quantity,
        apis::meta::v1::{LabelSelector, Time},
    },
};
use serde::{Deserialize, Serialize};

use crate::{
    objects::{ApiObject, ListMeta},
    CUSTOM_METRICS_GROUP, CUSTOM_METRICS_VERSION,
};

pub const METRIC_VALUE_LIST_KIND: &str = "MetricValueList";

/// Value of a single metric for a single described object.
///
/// Metric values don't carry object metadata, so they can't be named or self linked.
#[derive(ApiObject, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    /// object the metric was collected for
    pub described_object: ObjectReference,
    pub metric_name: String,
    /// time at which the metric was produced
    pub timestamp: Time,
    /// window over which the metric was calculated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_seconds: Option<i64>,
    pub value: Quantity,
    /// selector of the metric series, if the metric was selected by labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

impl MetricValue {
    pub fn new(described_object: ObjectReference, metric_name: &str, value: Quantity) -> Self {
        Self {
            described_object,
            metric_name: metric_name.to_owned(),
            timestamp: Time(Utc::now()),
            window_seconds: None,
            value,
            selector: None,
        }
    }
}

#[derive(ApiObject, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricValueList {
    pub api_version: String,
    pub kind: String,
    #[list_meta]
    #[serde(default)]
    pub metadata: ListMeta,
    #[list_items]
    pub items: Vec<MetricValue>,
}

impl MetricValueList {
    pub fn new(items: Vec<MetricValue>) -> Self {
        Self {
            api_version: format!("{CUSTOM_METRICS_GROUP}/{CUSTOM_METRICS_VERSION}"),
            kind: METRIC_VALUE_LIST_KIND.to_owned(),
            metadata: ListMeta::default(),
            items,
        }
    }
}
