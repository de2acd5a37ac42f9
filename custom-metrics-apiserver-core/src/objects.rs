use kube::core::{DynamicObject, ObjectList};

pub use custom_metrics_apiserver_macros::ApiObject;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ListMeta, ObjectMeta};

/// A value that can be returned from the API, optionally carrying a self link.
///
/// Every method has a default describing a plain object without metadata,
/// which can't be named and can't store a self link.
pub trait ApiObject {
    fn object_meta(&self) -> Option<&ObjectMeta> {
        None
    }

    fn self_link(&self) -> Option<&str> {
        None
    }

    /// `None` when the object has no self link attribute at all
    fn self_link_mut(&mut self) -> Option<&mut Option<String>> {
        None
    }

    fn is_list(&self) -> bool {
        false
    }

    fn as_list_mut(&mut self) -> Option<&mut dyn ListObject> {
        None
    }
}

pub trait ListObject {
    fn item_count(&self) -> usize;

    /// Yields the items in their stored order.
    fn items_mut<'a>(&'a mut self) -> Box<dyn Iterator<Item = &'a mut dyn ApiObject> + 'a>;
}

pub fn is_list_type(obj: &dyn ApiObject) -> bool {
    obj.is_list()
}

/// Calls `op` for every item of a list, stopping on the first error.
/// Non-list objects have no items, so `op` is never called for them.
pub fn each_list_item<E>(
    obj: &mut dyn ApiObject,
    mut op: impl FnMut(&mut dyn ApiObject) -> Result<(), E>,
) -> Result<(), E> {
    let list = match obj.as_list_mut() {
        Some(list) => list,
        None => return Ok(()),
    };

    for item in list.items_mut() {
        op(item)?;
    }

    Ok(())
}

impl ApiObject for DynamicObject {
    fn object_meta(&self) -> Option<&ObjectMeta> {
        Some(&self.metadata)
    }

    fn self_link(&self) -> Option<&str> {
        self.metadata.self_link.as_deref()
    }

    fn self_link_mut(&mut self) -> Option<&mut Option<String>> {
        Some(&mut self.metadata.self_link)
    }
}

impl<K> ApiObject for ObjectList<K>
where
    K: ApiObject + Clone,
{
    fn self_link(&self) -> Option<&str> {
        self.metadata.self_link.as_deref()
    }

    fn self_link_mut(&mut self) -> Option<&mut Option<String>> {
        Some(&mut self.metadata.self_link)
    }

    fn is_list(&self) -> bool {
        true
    }

    fn as_list_mut(&mut self) -> Option<&mut dyn ListObject> {
        Some(self)
    }
}

impl<K> ListObject for ObjectList<K>
where
    K: ApiObject + Clone,
{
    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn items_mut<'a>(&'a mut self) -> Box<dyn Iterator<Item = &'a mut dyn ApiObject> + 'a> {
        Box::new(self.items.iter_mut().map(|item| item as &mut dyn ApiObject))
    }
}
