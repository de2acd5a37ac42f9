use std::collections::BTreeSet;

use http::{Method, Request};

use crate::helpers::query_flag;

pub const DEFAULT_API_PREFIXES: [&str; 2] = ["apis", "api"];
pub const DEFAULT_GROUPLESS_API_PREFIXES: [&str; 1] = ["api"];

/// Subresources of a namespace itself, as opposed to resources living inside it
const NAMESPACE_SUBRESOURCES: [&str; 2] = ["status", "finalize"];

/// Information about the API resource a request targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub is_resource_request: bool,
    pub path: String,
    pub verb: String,
    pub api_prefix: String,
    pub api_group: String,
    pub api_version: String,
    pub namespace: String,
    pub resource: String,
    pub subresource: String,
    pub name: String,
    /// path segments following the resource scope (`resource[/name[/subresource...]]`)
    pub parts: Vec<String>,
}

/// Resolves [`RequestInfo`] out of Kubernetes-style API paths:
///
/// ```text
/// /apis/{group}/{version}/namespaces/{namespace}/{resource}/{name}/{subresource}
/// /apis/{group}/{version}/{resource}/{name}/{subresource}
/// /api/{version}/...
/// ```
#[derive(Debug, Clone)]
pub struct RequestInfoResolver {
    api_prefixes: BTreeSet<String>,
    groupless_api_prefixes: BTreeSet<String>,
}

impl Default for RequestInfoResolver {
    fn default() -> Self {
        Self::new(&DEFAULT_API_PREFIXES, &DEFAULT_GROUPLESS_API_PREFIXES)
    }
}

impl RequestInfoResolver {
    pub fn new(api_prefixes: &[&str], groupless_api_prefixes: &[&str]) -> Self {
        Self {
            api_prefixes: api_prefixes.iter().map(|p| p.to_string()).collect(),
            groupless_api_prefixes: groupless_api_prefixes
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }

    pub fn resolve<B>(&self, req: &Request<B>) -> RequestInfo {
        let path = req.uri().path();
        let mut info = RequestInfo {
            is_resource_request: false,
            path: path.to_owned(),
            verb: req.method().as_str().to_lowercase(),
            ..Default::default()
        };

        let segments = split_path(path);
        // the shortest resource path is /{prefix}/{version}/{resource}
        if segments.len() < 3 || !self.api_prefixes.contains(segments[0]) {
            return info;
        }

        let mut parts = &segments[..];
        info.api_prefix = parts[0].to_owned();
        parts = &parts[1..];

        if !self.groupless_api_prefixes.contains(&info.api_prefix) {
            if parts.len() < 3 {
                return info;
            }

            info.api_group = parts[0].to_owned();
            parts = &parts[1..];
        }

        info.is_resource_request = true;
        info.api_version = parts[0].to_owned();
        parts = &parts[1..];

        info.verb = match *req.method() {
            Method::POST => "create",
            Method::GET | Method::HEAD => "get",
            Method::PUT => "update",
            Method::PATCH => "patch",
            Method::DELETE => "delete",
            _ => "",
        }
        .to_owned();

        if parts.first() == Some(&"namespaces") {
            if let Some(namespace) = parts.get(1) {
                info.namespace = namespace.to_string();

                if parts.len() > 2 && !NAMESPACE_SUBRESOURCES.contains(&parts[2]) {
                    parts = &parts[2..];
                }
            }
        }

        info.parts = parts.iter().map(|p| p.to_string()).collect();

        if let Some(resource) = parts.first() {
            info.resource = resource.to_string();
        }
        if let Some(name) = parts.get(1) {
            info.name = name.to_string();
        }
        if let Some(subresource) = parts.get(2) {
            info.subresource = subresource.to_string();
        }

        if info.name.is_empty() && info.verb == "get" {
            info.verb = "list".to_owned();
        }
        if info.name.is_empty() && info.verb == "delete" {
            info.verb = "deletecollection".to_owned();
        }
        if matches!(info.verb.as_str(), "get" | "list")
            && query_flag(req.uri().query(), "watch")
        {
            info.verb = "watch".to_owned();
        }

        info
    }
}

fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }

    trimmed.split('/').collect()
}

/// Request scoped values handed down to the response helpers.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    request_info: Option<RequestInfo>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_info(request_info: RequestInfo) -> Self {
        Self {
            request_info: Some(request_info),
        }
    }

    pub fn request_info(&self) -> Option<&RequestInfo> {
        self.request_info.as_ref()
    }
}
