use std::{error::Error as StdError, sync::Arc};

use derive_builder::Builder;
use http::{Request, Response};
use kube::core::{GroupVersion, GroupVersionKind};
use log::{debug, trace};
use thiserror::Error;

use crate::{
    naming::{NamingError, ScopeNamer},
    negotiation::{error_negotiated, NegotiatedSerializer},
    objects::{each_list_item, is_list_type, ApiObject},
    request::{RequestContext, RequestInfo, RequestInfoResolver},
};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("missing requestInfo")]
    MissingRequestInfo,
    #[error("{}", .0)]
    NamingError(NamingError),
}

/// A failed [`set_list_self_link`], remembering how many list items were visited before it stopped.
#[derive(Debug, Error)]
#[error("Couldn't set list self links after visiting {visited} items! Reason: {source}")]
pub struct ListSelfLinkError {
    pub visited: usize,
    #[source]
    pub source: HandlerError,
}

/// Everything a handler needs to know about the API it serves.
#[derive(Clone, Builder)]
pub struct RequestScope {
    pub serializer: Arc<dyn NegotiatedSerializer>,
    pub kind: GroupVersionKind,
    pub namer: Arc<dyn ScopeNamer>,
    #[builder(default)]
    pub resolver: RequestInfoResolver,
}

impl RequestScope {
    pub fn group_version(&self) -> GroupVersion {
        GroupVersion {
            group: self.kind.group.to_owned(),
            version: self.kind.version.to_owned(),
        }
    }
}

pub fn write_error(
    scope: &RequestScope,
    err: &(dyn StdError + 'static),
    w: &mut Response<Vec<u8>>,
    req: &Request<()>,
) {
    error_negotiated(err, scope.serializer.as_ref(), &scope.group_version(), w, req)
}

/// Sets the self link of an object to the link generated by `namer`.
///
/// Objects the namer can't generate a link for are left untouched without
/// reporting an error; only storing a generated link can fail.
pub fn set_self_link(
    obj: &mut dyn ApiObject,
    request_info: &RequestInfo,
    namer: &dyn ScopeNamer,
) -> Result<(), NamingError> {
    let uri = match namer.generate_link(request_info, obj) {
        Ok(uri) => uri,
        Err(error) => {
            trace!("Skipping self link: {error}");
            return Ok(());
        }
    };

    namer.set_self_link(obj, uri)
}

/// Sets the self link of a list to the request's list link, then the self links
/// of its items. Returns the number of items visited.
///
/// A failure to store the list's own link is only logged; a failure on any item
/// stops the iteration right away.
pub fn set_list_self_link(
    obj: &mut dyn ApiObject,
    ctx: &RequestContext,
    req: &Request<()>,
    namer: &dyn ScopeNamer,
) -> Result<usize, ListSelfLinkError> {
    if !is_list_type(obj) {
        return Ok(0);
    }

    let uri = namer
        .generate_list_link(req)
        .map_err(|error| ListSelfLinkError {
            visited: 0,
            source: HandlerError::NamingError(error),
        })?;
    if let Err(error) = namer.set_self_link(obj, uri) {
        debug!("Unable to set self link on object: {error}");
    }

    let request_info = ctx.request_info().ok_or(ListSelfLinkError {
        visited: 0,
        source: HandlerError::MissingRequestInfo,
    })?;

    let mut count = 0;
    each_list_item(obj, |item| {
        count += 1;
        set_self_link(item, request_info, namer)
    })
    .map_err(|error| ListSelfLinkError {
        visited: count,
        source: HandlerError::NamingError(error),
    })?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::{
        borrow::Cow,
        sync::{Arc, Mutex},
    };

    use http::{header::ACCEPT, Request, Response, StatusCode};
    use kube::core::{DynamicObject, GroupVersionKind, ObjectList};
    use serde_json::json;

    use crate::{
        custom_metrics::{MetricValue, MetricValueList},
        naming::{ContextBasedNaming, NamingError, ScopeNamer},
        negotiation::CodecFactory,
        objects::{ApiObject, ObjectMeta},
        request::{RequestContext, RequestInfo, RequestInfoResolver},
        status::StatusError,
    };

    use super::{
        set_list_self_link, set_self_link, write_error, HandlerError, RequestScope,
        RequestScopeBuilder,
    };

    /// Names objects `/things/{name}`, failing wherever it was told to.
    #[derive(Default)]
    struct ScriptedNamer {
        fail_list_link: bool,
        fail_list_store: bool,
        fail_link_for: Option<&'static str>,
        fail_store_for: Option<&'static str>,
        linked: Mutex<Vec<String>>,
    }

    fn object_name(obj: &dyn ApiObject) -> Option<String> {
        obj.object_meta().and_then(|meta| meta.name.clone())
    }

    impl ScopeNamer for ScriptedNamer {
        fn generate_link(
            &self,
            _request_info: &RequestInfo,
            obj: &dyn ApiObject,
        ) -> Result<String, NamingError> {
            let name = object_name(obj).ok_or(NamingError::MissingName)?;
            if self.fail_link_for == Some(name.as_str()) {
                return Err(NamingError::Custom(Cow::Owned(format!("no link for {name}"))));
            }

            Ok(format!("/things/{name}"))
        }

        fn generate_list_link(&self, req: &Request<()>) -> Result<String, NamingError> {
            if self.fail_list_link {
                return Err(NamingError::Custom(Cow::Borrowed("no list link")));
            }

            Ok(req.uri().path().to_owned())
        }

        fn set_self_link(&self, obj: &mut dyn ApiObject, uri: String) -> Result<(), NamingError> {
            if obj.is_list() && self.fail_list_store {
                return Err(NamingError::Custom(Cow::Borrowed("list is read only")));
            }
            if let Some(name) = object_name(obj) {
                if self.fail_store_for == Some(name.as_str()) {
                    return Err(NamingError::Custom(Cow::Owned(format!("{name} is read only"))));
                }
            }

            self.linked.lock().unwrap().push(uri.clone());
            *obj.self_link_mut().ok_or(NamingError::SelfLinkUnsupported)? = Some(uri);

            Ok(())
        }
    }

    fn things(count: usize) -> ObjectList<DynamicObject> {
        let items = (1..=count)
            .map(|i| json!({ "apiVersion": "v1", "kind": "Thing", "metadata": { "name": format!("item-{i}") } }))
            .collect::<Vec<_>>();

        serde_json::from_value(json!({ "apiVersion": "v1", "kind": "ThingList", "metadata": {}, "items": items })).unwrap()
    }

    fn thing(name: &str) -> DynamicObject {
        let mut thing: DynamicObject =
            serde_json::from_value(json!({ "apiVersion": "v1", "kind": "Thing", "metadata": {} }))
                .unwrap();
        thing.metadata = ObjectMeta {
            name: Some(name.to_owned()),
            ..Default::default()
        };

        thing
    }

    fn list_request() -> Request<()> {
        Request::get("/apis/example.dev/v1/things").body(()).unwrap()
    }

    fn context() -> RequestContext {
        RequestContext::with_request_info(RequestInfoResolver::default().resolve(&list_request()))
    }

    fn item_links(list: &ObjectList<DynamicObject>) -> Vec<Option<&str>> {
        list.items.iter().map(|item| item.self_link()).collect()
    }

    #[test]
    fn single_object_gets_generated_link() {
        let namer = ScriptedNamer::default();
        let mut object = thing("a");

        set_self_link(&mut object, &RequestInfo::default(), &namer).unwrap();

        assert_eq!(object.self_link(), Some("/things/a"));
    }

    #[test]
    fn single_object_link_generation_failure_is_not_an_error() {
        let namer = ScriptedNamer {
            fail_link_for: Some("a"),
            ..Default::default()
        };
        let mut object = thing("a");

        set_self_link(&mut object, &RequestInfo::default(), &namer).unwrap();

        assert_eq!(object.self_link(), None);
        assert!(namer.linked.lock().unwrap().is_empty());
    }

    #[test]
    fn single_object_link_store_failure_is_an_error() {
        let namer = ScriptedNamer {
            fail_store_for: Some("a"),
            ..Default::default()
        };

        let result = set_self_link(&mut thing("a"), &RequestInfo::default(), &namer);

        assert_eq!(result, Err(NamingError::Custom(Cow::Borrowed("a is read only"))));
    }

    #[test]
    fn non_list_objects_are_skipped() {
        let namer = ScriptedNamer::default();
        let mut object = thing("a");

        let count =
            set_list_self_link(&mut object, &context(), &list_request(), &namer).unwrap();

        assert_eq!(count, 0);
        assert_eq!(object.self_link(), None);
    }

    #[test]
    fn all_items_are_linked() {
        let namer = ScriptedNamer::default();
        let mut list = things(3);

        let count = set_list_self_link(&mut list, &context(), &list_request(), &namer).unwrap();

        assert_eq!(count, 3);
        assert_eq!(list.self_link(), Some("/apis/example.dev/v1/things"));
        assert_eq!(
            item_links(&list),
            [Some("/things/item-1"), Some("/things/item-2"), Some("/things/item-3")]
        );
    }

    #[test]
    fn empty_lists_still_get_a_link() {
        let namer = ScriptedNamer::default();
        let mut list = things(0);

        let count = set_list_self_link(&mut list, &context(), &list_request(), &namer).unwrap();

        assert_eq!(count, 0);
        assert_eq!(list.self_link(), Some("/apis/example.dev/v1/things"));
    }

    #[test]
    fn item_store_failure_stops_iteration() {
        let namer = ScriptedNamer {
            fail_store_for: Some("item-2"),
            ..Default::default()
        };
        let mut list = things(4);

        let error =
            set_list_self_link(&mut list, &context(), &list_request(), &namer).unwrap_err();

        assert_eq!(error.visited, 2);
        assert!(matches!(
            error.source,
            HandlerError::NamingError(NamingError::Custom(ref message)) if message == "item-2 is read only"
        ));
        assert_eq!(item_links(&list), [Some("/things/item-1"), None, None, None]);
    }

    #[test]
    fn item_link_generation_failure_is_skipped() {
        let namer = ScriptedNamer {
            fail_link_for: Some("item-2"),
            ..Default::default()
        };
        let mut list = things(3);

        let count = set_list_self_link(&mut list, &context(), &list_request(), &namer).unwrap();

        assert_eq!(count, 3);
        assert_eq!(
            item_links(&list),
            [Some("/things/item-1"), None, Some("/things/item-3")]
        );
    }

    #[test]
    fn list_link_generation_failure_visits_nothing() {
        let namer = ScriptedNamer {
            fail_list_link: true,
            ..Default::default()
        };
        let mut list = things(3);

        let error =
            set_list_self_link(&mut list, &context(), &list_request(), &namer).unwrap_err();

        assert_eq!(error.visited, 0);
        assert!(matches!(error.source, HandlerError::NamingError(_)));
        assert!(namer.linked.lock().unwrap().is_empty());
        assert_eq!(item_links(&list), [None, None, None]);
    }

    #[test]
    fn list_link_store_failure_is_only_logged() {
        let namer = ScriptedNamer {
            fail_list_store: true,
            ..Default::default()
        };
        let mut list = things(2);

        let count = set_list_self_link(&mut list, &context(), &list_request(), &namer).unwrap();

        assert_eq!(count, 2);
        assert_eq!(list.self_link(), None);
        assert_eq!(item_links(&list), [Some("/things/item-1"), Some("/things/item-2")]);
    }

    #[test]
    fn missing_request_info_visits_nothing() {
        let namer = ScriptedNamer::default();
        let mut list = things(2);

        let error = set_list_self_link(&mut list, &RequestContext::new(), &list_request(), &namer)
            .unwrap_err();

        assert_eq!(error.visited, 0);
        assert!(matches!(error.source, HandlerError::MissingRequestInfo));
        assert_eq!(error.source.to_string(), "missing requestInfo");
        assert_eq!(item_links(&list), [None, None]);
    }

    #[test]
    fn metric_lists_link_only_the_list() {
        let gv = kube::core::GroupVersion {
            group: "custom.metrics.k8s.io".to_owned(),
            version: "v1beta1".to_owned(),
        };
        let namer = ContextBasedNaming::new(&gv, false);
        let req = Request::get("/apis/custom.metrics.k8s.io/v1beta1/namespaces/default/pods/*/http_requests")
            .body(())
            .unwrap();
        let ctx = RequestContext::with_request_info(RequestInfoResolver::default().resolve(&req));
        let value = MetricValue::new(Default::default(), "http_requests", Default::default());
        let mut list = MetricValueList::new(vec![value.clone(), value]);

        let count = set_list_self_link(&mut list, &ctx, &req, &namer).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            list.metadata.self_link.as_deref(),
            Some("/apis/custom.metrics.k8s.io/v1beta1/namespaces/default/pods/*/http_requests")
        );
    }

    fn scope() -> RequestScope {
        RequestScopeBuilder::default()
            .serializer(Arc::new(CodecFactory::default()))
            .kind(GroupVersionKind {
                group: "custom.metrics.k8s.io".to_owned(),
                version: "v1beta1".to_owned(),
                kind: "MetricValueList".to_owned(),
            })
            .namer(Arc::new(ScriptedNamer::default()))
            .build()
            .unwrap()
    }

    #[test]
    fn scope_exposes_group_version() {
        let gv = scope().group_version();

        assert_eq!(gv.group, "custom.metrics.k8s.io");
        assert_eq!(gv.version, "v1beta1");
    }

    #[test]
    fn write_error_negotiates_status() {
        let req = Request::get("/apis/custom.metrics.k8s.io/v1beta1/namespaces/default/pods/*/missing")
            .header(ACCEPT, "application/json")
            .body(())
            .unwrap();
        let mut response = Response::new(Vec::new());

        write_error(
            &scope(),
            &StatusError::not_found("missing.custom.metrics.k8s.io", "*"),
            &mut response,
            &req,
        );

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], json!("Status"));
        assert_eq!(body["details"]["name"], json!("*"));
    }

    #[test]
    fn write_error_reports_handler_failures_as_internal() {
        let req = list_request();
        let mut response = Response::new(Vec::new());

        write_error(&scope(), &HandlerError::MissingRequestInfo, &mut response, &req);

        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], json!("Internal error occurred: missing requestInfo"));
    }
}
