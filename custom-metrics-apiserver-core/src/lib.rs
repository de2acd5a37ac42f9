// lets the ApiObject derive refer to this crate by name from within it
extern crate self as custom_metrics_apiserver_core;

pub mod custom_metrics;
pub mod handlers;
pub mod helpers;
pub mod naming;
pub mod negotiation;
pub mod objects;
pub mod request;
pub mod status;

pub const CUSTOM_METRICS_GROUP: &str = "custom.metrics.k8s.io";
pub const CUSTOM_METRICS_VERSION: &str = "v1beta1";
