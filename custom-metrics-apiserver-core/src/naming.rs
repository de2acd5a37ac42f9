use std::borrow::Cow;

use http::Request;
use kube::core::GroupVersion;
use thiserror::Error;

use crate::{helpers::escape_path_segment, objects::ApiObject, request::RequestInfo};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("Object is missing metadata!")]
    MissingObjectMetadata,
    #[error("Object is missing a name!")]
    MissingName,
    #[error("Object doesn't have a self link attribute!")]
    SelfLinkUnsupported,
    #[error("'{}' can't be used as a list link!", .0)]
    InvalidListPath(String),
    #[error("{}", .0)]
    Custom(Cow<'static, str>),
}

/// Computes and stores self links according to a particular API layout.
pub trait ScopeNamer: Send + Sync {
    fn generate_link(
        &self,
        request_info: &RequestInfo,
        obj: &dyn ApiObject,
    ) -> Result<String, NamingError>;

    fn generate_list_link(&self, req: &Request<()>) -> Result<String, NamingError>;

    fn set_self_link(&self, obj: &mut dyn ApiObject, uri: String) -> Result<(), NamingError>;
}

/// Names objects after the REST path they are served under, filling
/// whatever the object's metadata lacks from the request.
#[derive(Debug, Clone)]
pub struct ContextBasedNaming {
    /// `/apis/{group}/{version}` or `/api/{version}` for the core group
    pub api_root: String,
    /// never put a `namespaces/{namespace}` segment into links
    pub cluster_scoped: bool,
}

impl ContextBasedNaming {
    pub fn new(group_version: &GroupVersion, cluster_scoped: bool) -> Self {
        let api_root = match group_version.group.as_str() {
            "" => format!("/api/{}", group_version.version),
            group => format!("/apis/{group}/{}", group_version.version),
        };

        Self {
            api_root,
            cluster_scoped,
        }
    }
}

impl ScopeNamer for ContextBasedNaming {
    fn generate_link(
        &self,
        request_info: &RequestInfo,
        obj: &dyn ApiObject,
    ) -> Result<String, NamingError> {
        let meta = obj
            .object_meta()
            .ok_or(NamingError::MissingObjectMetadata)?;

        let name = match meta.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !request_info.name.is_empty() => request_info.name.as_str(),
            _ => return Err(NamingError::MissingName),
        };
        let namespace = match meta.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => namespace,
            _ => request_info.namespace.as_str(),
        };

        let mut link = self.api_root.clone();
        if !self.cluster_scoped && !namespace.is_empty() {
            link.push_str("/namespaces/");
            link.push_str(&escape_path_segment(namespace));
        }
        link.push('/');
        link.push_str(&request_info.resource);
        link.push('/');
        link.push_str(&escape_path_segment(name));
        if !request_info.subresource.is_empty() {
            link.push('/');
            link.push_str(&request_info.subresource);
        }

        Ok(link)
    }

    fn generate_list_link(&self, req: &Request<()>) -> Result<String, NamingError> {
        let path = req.uri().path();
        if !path.starts_with('/') {
            return Err(NamingError::InvalidListPath(path.to_owned()));
        }

        Ok(path.to_owned())
    }

    fn set_self_link(&self, obj: &mut dyn ApiObject, uri: String) -> Result<(), NamingError> {
        let self_link = obj
            .self_link_mut()
            .ok_or(NamingError::SelfLinkUnsupported)?;
        *self_link = Some(uri);

        Ok(())
    }
}
