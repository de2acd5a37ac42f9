use std::any::type_name;

use kube::core::GroupVersion;

pub fn pretty_type_name<'a, T: ?Sized>() -> &'a str {
    type_name::<T>().split("::").last().unwrap_or_default()
}

/// `group/version`, or just `version` for the core group
pub fn api_version(group_version: &GroupVersion) -> String {
    match group_version.group.as_str() {
        "" => group_version.version.to_owned(),
        group => format!("{group}/{}", group_version.version),
    }
}

pub fn escape_path_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

/// Whether a boolean query parameter (`?pretty=true`, `?watch=1`) is switched on
pub fn query_flag(query: Option<&str>, key: &str) -> bool {
    query
        .map(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .any(|(k, v)| k == key && (v == "true" || v == "1"))
        })
        .unwrap_or(false)
}

pub fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub trait With<F> {
    fn with(self, op: F) -> Self;
}

impl<T, F> With<F> for T
where
    F: FnOnce(&mut Self),
{
    fn with(mut self, op: F) -> Self {
        op(&mut self);

        self
    }
}
