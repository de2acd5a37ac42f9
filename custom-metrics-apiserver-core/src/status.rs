use std::error::Error as StdError;

use http::StatusCode;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Status, StatusCause, StatusDetails};
use thiserror::Error;

pub const STATUS_FAILURE: &str = "Failure";

pub const REASON_NOT_FOUND: &str = "NotFound";
pub const REASON_BAD_REQUEST: &str = "BadRequest";
pub const REASON_METHOD_NOT_ALLOWED: &str = "MethodNotAllowed";
pub const REASON_NOT_ACCEPTABLE: &str = "NotAcceptable";
pub const REASON_INTERNAL_ERROR: &str = "InternalError";

/// An error that already knows how it should be presented to API clients.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StatusError {
    message: String,
    status: Status,
}

impl StatusError {
    pub fn new(code: StatusCode, reason: &str, message: String, details: Option<StatusDetails>) -> Self {
        let status = Status {
            code: Some(code.as_u16().into()),
            details,
            message: Some(message.clone()),
            reason: Some(reason.to_owned()),
            status: Some(STATUS_FAILURE.to_owned()),
            ..Default::default()
        };

        Self { message, status }
    }

    /// `resource` is the plural, group qualified resource name, e.g. `pods` or `http_requests.custom.metrics.k8s.io`
    pub fn not_found(resource: &str, name: &str) -> Self {
        let details = StatusDetails {
            kind: Some(resource.to_owned()),
            name: Some(name.to_owned()),
            ..Default::default()
        };

        Self::new(
            StatusCode::NOT_FOUND,
            REASON_NOT_FOUND,
            format!(r#"{resource} "{name}" not found"#),
            Some(details),
        )
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, REASON_BAD_REQUEST, message.into(), None)
    }

    pub fn method_not_supported(resource: &str, verb: &str) -> Self {
        let details = StatusDetails {
            kind: Some(resource.to_owned()),
            ..Default::default()
        };

        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            REASON_METHOD_NOT_ALLOWED,
            format!("{verb} is not supported on resources of kind {resource:?}"),
            Some(details),
        )
    }

    pub fn not_acceptable(accepted: &[&str]) -> Self {
        Self::new(
            StatusCode::NOT_ACCEPTABLE,
            REASON_NOT_ACCEPTABLE,
            format!(
                "only the following media types are accepted: {}",
                accepted.join(", ")
            ),
            None,
        )
    }

    pub fn internal_error(error: &dyn StdError) -> Self {
        let details = StatusDetails {
            causes: Some(vec![StatusCause {
                message: Some(error.to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            REASON_INTERNAL_ERROR,
            format!("Internal error occurred: {error}"),
            Some(details),
        )
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn code(&self) -> StatusCode {
        status_code(&self.status)
    }
}

/// Finds a [`StatusError`] in the error chain, anything else is an internal error.
pub fn error_to_api_status(error: &(dyn StdError + 'static)) -> Status {
    let mut current = Some(error);
    while let Some(error) = current {
        if let Some(status_error) = error.downcast_ref::<StatusError>() {
            return status_error.status().clone();
        }

        current = error.source();
    }

    StatusError::internal_error(error).status
}

pub fn status_code(status: &Status) -> StatusCode {
    status
        .code
        .and_then(|code| u16::try_from(code).ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use thiserror::Error;

    use super::{error_to_api_status, status_code, StatusError};

    #[derive(Debug, Error)]
    #[error("lookup failed")]
    struct Wrapper(#[source] StatusError);

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct Plain;

    #[test]
    fn not_found_describes_resource() {
        let error = StatusError::not_found("pods", "web-0");

        assert_eq!(error.code(), StatusCode::NOT_FOUND);
        assert_eq!(error.to_string(), r#"pods "web-0" not found"#);
        assert_eq!(error.status().reason.as_deref(), Some("NotFound"));
        assert_eq!(error.status().status.as_deref(), Some("Failure"));
        assert_eq!(
            error.status().details.as_ref().unwrap().name.as_deref(),
            Some("web-0")
        );
    }

    #[test]
    fn status_errors_are_found_in_source_chain() {
        let status = error_to_api_status(&Wrapper(StatusError::bad_request("bad selector")));

        assert_eq!(status.code, Some(400));
        assert_eq!(status.message.as_deref(), Some("bad selector"));
    }

    #[test]
    fn other_errors_become_internal() {
        let status = error_to_api_status(&Plain);

        assert_eq!(status_code(&status), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status.reason.as_deref(), Some("InternalError"));
        assert_eq!(
            status.message.as_deref(),
            Some("Internal error occurred: disk on fire")
        );
    }
}
