use std::error::Error as StdError;

use http::{
    header::{HeaderValue, CONTENT_TYPE},
    Request, Response, StatusCode,
};
use kube::core::GroupVersion;
use log::{debug, error};
use serde::Serialize;

use crate::{
    helpers::{pretty_type_name, query_flag, With},
    status::{error_to_api_status, status_code, StatusError},
};

use super::{negotiate_output_media_type, NegotiatedSerializer, APPLICATION_JSON};

/// Writes `object` with `code` in the media type the client asked for.
///
/// If no supported media type is acceptable to the client, a `406 Not Acceptable`
/// status is written as plain JSON instead.
pub fn write_object_negotiated<T: Serialize>(
    serializer: &dyn NegotiatedSerializer,
    group_version: &GroupVersion,
    w: &mut Response<Vec<u8>>,
    req: &Request<()>,
    code: StatusCode,
    object: &T,
) {
    let info = match negotiate_output_media_type(req, serializer) {
        Ok(info) => info,
        Err(negotiation_error) => {
            debug!("{negotiation_error}");

            let supported = serializer
                .supported_media_types()
                .iter()
                .map(|info| info.media_type)
                .collect::<Vec<_>>();
            let status_error = StatusError::not_acceptable(&supported);
            write_raw_json(status_error.code(), status_error.status(), w);
            return;
        }
    };

    let pretty = query_flag(req.uri().query(), "pretty");
    let encoded = serde_json::to_value(object)
        .map_err(super::EncodingError::ConversionError)
        .and_then(|value| serializer.encode(&info, group_version, value, pretty));

    match encoded {
        Ok(body) => {
            *w = Response::new(body).with(|response| {
                *response.status_mut() = code;
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(info.media_type));
            });
        }
        Err(encoding_error) => {
            error!(
                "Couldn't encode {} as {}! {encoding_error}",
                pretty_type_name::<T>(),
                info.media_type
            );

            let status_error = StatusError::internal_error(&encoding_error);
            write_raw_json(status_error.code(), status_error.status(), w);
        }
    }
}

/// Renders `err` as a `Status` object in the media type the client asked for.
pub fn error_negotiated(
    err: &(dyn StdError + 'static),
    serializer: &dyn NegotiatedSerializer,
    group_version: &GroupVersion,
    w: &mut Response<Vec<u8>>,
    req: &Request<()>,
) {
    let status = error_to_api_status(err);
    let code = status_code(&status);

    debug!(
        "Responding to {} {} with {code}: {err}",
        req.method(),
        req.uri().path()
    );

    if code == StatusCode::NO_CONTENT {
        *w = Response::new(Vec::new()).with(|response| *response.status_mut() = code);
        return;
    }

    write_object_negotiated(serializer, group_version, w, req, code, &status);
}

/// Writes `object` as JSON, bypassing negotiation.
pub fn write_raw_json<T: Serialize>(code: StatusCode, object: &T, w: &mut Response<Vec<u8>>) {
    let (code, body) = match serde_json::to_vec(object) {
        Ok(body) => (code, body),
        Err(encoding_error) => {
            error!("Couldn't encode {} as JSON! {encoding_error}", pretty_type_name::<T>());
            (StatusCode::INTERNAL_SERVER_ERROR, encoding_error.to_string().into_bytes())
        }
    };

    *w = Response::new(body).with(|response| {
        *response.status_mut() = code;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    });
}
