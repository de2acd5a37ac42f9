use http::{header::ACCEPT, Request};
use kube::core::GroupVersion;
use serde_json::Value;
use thiserror::Error;

use crate::helpers::api_version;

pub mod writers;

pub use writers::{error_negotiated, write_object_negotiated, write_raw_json};

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_YAML: &str = "application/yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerInfo {
    pub media_type: &'static str,
    pub format: MediaFormat,
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("None of the accepted media types ({}) is supported!", .0)]
    NotAcceptable(String),
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Couldn't convert the object! Reason: {}", .0)]
    ConversionError(serde_json::Error),
    #[error("Couldn't encode the object as JSON! Reason: {}", .0)]
    JsonError(serde_json::Error),
    #[error("Couldn't encode the object as YAML! Reason: {}", .0)]
    YamlError(serde_yaml::Error),
}

/// Serializes API objects into any of the media types it supports.
pub trait NegotiatedSerializer: Send + Sync {
    /// Ordered by preference, the first entry is used when the client doesn't care.
    fn supported_media_types(&self) -> &[SerializerInfo];

    /// Encodes `object` as a member of `group_version`.
    fn encode(
        &self,
        info: &SerializerInfo,
        group_version: &GroupVersion,
        object: Value,
        pretty: bool,
    ) -> Result<Vec<u8>, EncodingError>;
}

/// JSON and YAML serializers; objects lacking an `apiVersion` get the one they are encoded for.
#[derive(Debug, Clone)]
pub struct CodecFactory {
    media_types: Vec<SerializerInfo>,
}

impl Default for CodecFactory {
    fn default() -> Self {
        Self {
            media_types: vec![
                SerializerInfo {
                    media_type: APPLICATION_JSON,
                    format: MediaFormat::Json,
                },
                SerializerInfo {
                    media_type: APPLICATION_YAML,
                    format: MediaFormat::Yaml,
                },
            ],
        }
    }
}

impl NegotiatedSerializer for CodecFactory {
    fn supported_media_types(&self) -> &[SerializerInfo] {
        &self.media_types
    }

    fn encode(
        &self,
        info: &SerializerInfo,
        group_version: &GroupVersion,
        mut object: Value,
        pretty: bool,
    ) -> Result<Vec<u8>, EncodingError> {
        if let Value::Object(fields) = &mut object {
            fields
                .entry("apiVersion")
                .or_insert_with(|| Value::String(api_version(group_version)));
        }

        match (info.format, pretty) {
            (MediaFormat::Json, false) => {
                serde_json::to_vec(&object).map_err(EncodingError::JsonError)
            }
            (MediaFormat::Json, true) => {
                serde_json::to_vec_pretty(&object).map_err(EncodingError::JsonError)
            }
            (MediaFormat::Yaml, _) => serde_yaml::to_string(&object)
                .map(String::into_bytes)
                .map_err(EncodingError::YamlError),
        }
    }
}

/// Picks the serializer for a response according to the request's `Accept` header.
pub fn negotiate_output_media_type<B>(
    req: &Request<B>,
    serializer: &dyn NegotiatedSerializer,
) -> Result<SerializerInfo, NegotiationError> {
    let supported = serializer.supported_media_types();
    let accept = req
        .headers()
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    if accept.is_empty() {
        return supported
            .first()
            .cloned()
            .ok_or_else(|| NegotiationError::NotAcceptable(accept.to_owned()));
    }

    let mut clauses = accept.split(',').filter_map(parse_accept_clause).collect::<Vec<_>>();
    // stable, so equally weighted clauses keep the client's order
    clauses.sort_by(|(_, a), (_, b)| b.total_cmp(a));

    clauses
        .iter()
        .filter(|(_, quality)| *quality > 0.0)
        .find_map(|(media_range, _)| match_media_range(media_range, supported))
        .cloned()
        .ok_or_else(|| NegotiationError::NotAcceptable(accept.to_owned()))
}

fn parse_accept_clause(clause: &str) -> Option<(String, f32)> {
    let mut pieces = clause.split(';').map(str::trim);
    let media_range = pieces.next().filter(|range| !range.is_empty())?;
    let quality = pieces
        .filter_map(|param| param.strip_prefix("q="))
        .find_map(|q| q.parse::<f32>().ok())
        .unwrap_or(1.0);

    Some((media_range.to_lowercase(), quality))
}

fn match_media_range<'a>(
    media_range: &str,
    supported: &'a [SerializerInfo],
) -> Option<&'a SerializerInfo> {
    match media_range {
        "*/*" => supported.first(),
        range => match range.strip_suffix("/*") {
            Some(main_type) => supported.iter().find(|info| {
                info.media_type
                    .split_once('/')
                    .map(|(info_main_type, _)| info_main_type == main_type)
                    .unwrap_or(false)
            }),
            None => supported.iter().find(|info| info.media_type == range),
        },
    }
}
