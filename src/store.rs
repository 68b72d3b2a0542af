//! Read-only lookup of cached Stream resources.

use std::sync::Arc;

use kube::runtime::reflector::{ObjectRef, Store};

use crate::crd::Stream;

/// Cached lookup of Stream resources by namespace and name.
///
/// The controller only reads through this; the watch feed owns the writes.
pub trait StreamStore: Send + Sync {
    fn get(&self, namespace: &str, name: &str) -> Option<Arc<Stream>>;
}

impl StreamStore for Store<Stream> {
    fn get(&self, namespace: &str, name: &str) -> Option<Arc<Stream>> {
        Store::get(self, &ObjectRef::new(name).within(namespace))
    }
}
