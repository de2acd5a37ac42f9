use std::sync::Arc;

use custom_metrics_apiserver_core::{
    custom_metrics::MetricValueList,
    handlers::{set_list_self_link, write_error, RequestScope},
    helpers::query_param,
    negotiation::write_object_negotiated,
    request::{RequestContext, RequestInfo},
    status::{StatusError, REASON_NOT_FOUND},
};
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use log::debug;
use warp::{hyper::Body, path::FullPath, Filter};

use crate::provider::{CustomMetricsProvider, EqualitySelector, MetricTarget};

pub const LABEL_SELECTOR_PARAM: &str = "labelSelector";

/// Serves `[namespaces/{namespace}/]{resource}/{name|*}/{metric}` below the scope's group version.
pub fn metrics_routes(
    scope: Arc<RequestScope>,
    provider: Arc<dyn CustomMetricsProvider>,
) -> impl Filter<Extract = (warp::reply::Response,)> + Clone {
    let raw_query = warp::query::raw()
        .or(warp::any().map(String::new))
        .unify();

    warp::method()
        .and(warp::path::full())
        .and(raw_query)
        .and(warp::header::headers_cloned())
        .and(warp::any().map(move || scope.clone()))
        .and(warp::any().map(move || provider.clone()))
        .map(
            |method: Method,
             path: FullPath,
             query: String,
             headers: HeaderMap,
             scope: Arc<RequestScope>,
             provider: Arc<dyn CustomMetricsProvider>| {
                let response = match rebuild_request(method, &path, &query, headers) {
                    Ok(req) => serve_metrics(&scope, provider.as_ref(), &req),
                    Err(error) => {
                        let mut response = Response::new(Vec::new());
                        let req = Request::new(());
                        write_error(&scope, &error, &mut response, &req);
                        response
                    }
                };

                response.map(Body::from)
            },
        )
}

fn rebuild_request(
    method: Method,
    path: &FullPath,
    query: &str,
    headers: HeaderMap,
) -> Result<Request<()>, StatusError> {
    let uri = match query {
        "" => path.as_str().to_owned(),
        query => format!("{}?{query}", path.as_str()),
    };
    let uri = uri
        .parse::<Uri>()
        .map_err(|error| StatusError::bad_request(format!("invalid request URI: {error}")))?;

    let mut req = Request::new(());
    *req.method_mut() = method;
    *req.uri_mut() = uri;
    *req.headers_mut() = headers;

    Ok(req)
}

pub fn serve_metrics(
    scope: &RequestScope,
    provider: &dyn CustomMetricsProvider,
    req: &Request<()>,
) -> Response<Vec<u8>> {
    let mut response = Response::new(Vec::new());
    let ctx = RequestContext::with_request_info(scope.resolver.resolve(req));

    let mut list = match get_metrics(scope, provider, &ctx, req) {
        Ok(list) => list,
        Err(error) => {
            write_error(scope, &error, &mut response, req);
            return response;
        }
    };

    match set_list_self_link(&mut list, &ctx, req, scope.namer.as_ref()) {
        Ok(count) => {
            debug!("Serving {count} metric values for {}", req.uri().path());
            write_object_negotiated(
                scope.serializer.as_ref(),
                &scope.group_version(),
                &mut response,
                req,
                StatusCode::OK,
                &list,
            );
        }
        Err(error) => write_error(scope, &error, &mut response, req),
    }

    response
}

fn get_metrics(
    scope: &RequestScope,
    provider: &dyn CustomMetricsProvider,
    ctx: &RequestContext,
    req: &Request<()>,
) -> Result<MetricValueList, StatusError> {
    let info = ctx.request_info().ok_or_else(resource_not_found)?;
    if !is_served(scope, info) {
        return Err(resource_not_found());
    }

    if !matches!(info.verb.as_str(), "get" | "list") {
        return Err(StatusError::method_not_supported(&info.resource, &info.verb));
    }

    let target = MetricTarget {
        resource: &info.resource,
        namespace: Some(info.namespace.as_str()).filter(|namespace| !namespace.is_empty()),
    };
    let metric_name = info.subresource.as_str();

    let values = match info.name.as_str() {
        "*" => {
            let selector = query_param(req.uri().query(), LABEL_SELECTOR_PARAM)
                .map(|raw| EqualitySelector::parse(&raw))
                .transpose()?
                .unwrap_or_default();

            provider.get_metric_by_selector(target, &selector, metric_name)?
        }
        name => vec![provider.get_metric_by_name(target, name, metric_name)?],
    };

    Ok(MetricValueList::new(values))
}

fn is_served(scope: &RequestScope, info: &RequestInfo) -> bool {
    info.is_resource_request
        && info.api_group == scope.kind.group
        && info.api_version == scope.kind.version
        && !info.name.is_empty()
        && !info.subresource.is_empty()
        && info.parts.len() == 3
}

fn resource_not_found() -> StatusError {
    StatusError::new(
        StatusCode::NOT_FOUND,
        REASON_NOT_FOUND,
        "the server could not find the requested resource".to_owned(),
        None,
    )
}
