//! Minimal in-crate surface used by unit tests; it records every call as a
//! line and tracks parent links so ordering can be asserted.

use crate::surface::{Surface, SurfaceError};
use core_types::SurfaceHandle;
use std::collections::HashMap;
use vdom::{Behavior, NodeType};

#[derive(Default)]
pub(crate) struct MockSurface {
    next: u64,
    pub(crate) log: Vec<String>,
    pub(crate) kinds: HashMap<SurfaceHandle, String>,
    pub(crate) children: HashMap<SurfaceHandle, Vec<SurfaceHandle>>,
    pub(crate) fail_create_tag: Option<String>,
    pub(crate) fail_insert: bool,
}

impl MockSurface {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn container(&mut self) -> SurfaceHandle {
        self.alloc("#root".to_string())
    }

    fn alloc(&mut self, kind: String) -> SurfaceHandle {
        self.next += 1;
        let handle = SurfaceHandle(self.next);
        self.kinds.insert(handle, kind);
        handle
    }

    fn name(&self, handle: SurfaceHandle) -> String {
        match self.kinds.get(&handle) {
            Some(kind) => format!("{kind}{handle}"),
            None => format!("?{handle}"),
        }
    }

    /// Tags of the children of `parent`, in order.
    pub(crate) fn child_tags(&self, parent: SurfaceHandle) -> Vec<String> {
        self.children
            .get(&parent)
            .map(|list| {
                list.iter()
                    .filter_map(|h| self.kinds.get(h).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn drain_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log)
    }
}

impl Surface for MockSurface {
    fn create_handle(&mut self, kind: &NodeType) -> Result<SurfaceHandle, SurfaceError> {
        if self.fail_create_tag.as_deref() == Some(kind.tag()) {
            return Err(SurfaceError::Rejected(format!("cannot create {kind}")));
        }
        let handle = self.alloc(kind.tag().to_string());
        self.log.push(format!("create {}", self.name(handle)));
        Ok(handle)
    }

    fn set_property(
        &mut self,
        handle: SurfaceHandle,
        name: &str,
        value: &str,
    ) -> Result<(), SurfaceError> {
        self.log.push(format!("set {} {name}={value}", self.name(handle)));
        Ok(())
    }

    fn clear_property(&mut self, handle: SurfaceHandle, name: &str) -> Result<(), SurfaceError> {
        self.log.push(format!("clear {} {name}", self.name(handle)));
        Ok(())
    }

    fn bind_behavior(
        &mut self,
        handle: SurfaceHandle,
        event: &str,
        _behavior: &Behavior,
    ) -> Result<(), SurfaceError> {
        self.log.push(format!("bind {} {event}", self.name(handle)));
        Ok(())
    }

    fn unbind_behavior(
        &mut self,
        handle: SurfaceHandle,
        event: &str,
        _behavior: &Behavior,
    ) -> Result<(), SurfaceError> {
        self.log.push(format!("unbind {} {event}", self.name(handle)));
        Ok(())
    }

    fn insert_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
        before: Option<SurfaceHandle>,
    ) -> Result<(), SurfaceError> {
        if self.fail_insert {
            return Err(SurfaceError::Rejected("insert disabled".to_string()));
        }
        let list = self.children.entry(parent).or_default();
        match before.and_then(|b| list.iter().position(|h| *h == b)) {
            Some(at) => list.insert(at, child),
            None => list.push(child),
        }
        self.log
            .push(format!("insert {} into {}", self.name(child), self.name(parent)));
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
    ) -> Result<(), SurfaceError> {
        let list = self.children.entry(parent).or_default();
        let Some(at) = list.iter().position(|h| *h == child) else {
            return Err(SurfaceError::NotAChild { parent, child });
        };
        list.remove(at);
        self.log
            .push(format!("remove {} from {}", self.name(child), self.name(parent)));
        Ok(())
    }
}
