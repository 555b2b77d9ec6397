//! Work nodes and the generation-tagged pools that own them.
//!
//! Each pool holds one tree generation. Links between nodes (`parent`,
//! `child`, `sibling`, `alternate`) are [`FiberId`]s rather than references;
//! an id carries the epoch of the pool it was allocated from, so an id that
//! outlives its pool's reset resolves to `None` instead of to a reused slot.

use core_types::SurfaceHandle;
use std::fmt;
use std::sync::Arc;
use vdom::{Descriptor, NodeType, Props};

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiberId {
    idx: u32,
    epoch: u32,
}

impl fmt::Debug for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FiberId({}@e{})", self.idx, self.epoch)
    }
}

/// Verdict of the differ for one node, consumed once by the committer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Effect {
    #[default]
    None,
    Placement,
    Update,
    Deletion,
}

/// What a fiber was built from.
#[derive(Clone)]
pub(crate) enum FiberSource {
    /// Synthetic root: the container plus the requested top-level descriptor.
    Root(Arc<[Descriptor]>),
    Host(Descriptor),
}

pub(crate) struct Fiber {
    pub(crate) source: FiberSource,
    pub(crate) handle: Option<SurfaceHandle>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) effect: Effect,
}

impl Fiber {
    pub(crate) fn root(descriptor: Descriptor, container: SurfaceHandle) -> Self {
        Self {
            source: FiberSource::Root(Arc::from(vec![descriptor])),
            handle: Some(container),
            parent: None,
            child: None,
            sibling: None,
            alternate: None,
            effect: Effect::None,
        }
    }

    pub(crate) fn host(descriptor: Descriptor, parent: FiberId, effect: Effect) -> Self {
        Self {
            source: FiberSource::Host(descriptor),
            handle: None,
            parent: Some(parent),
            child: None,
            sibling: None,
            alternate: None,
            effect,
        }
    }

    /// `None` for the synthetic root.
    pub(crate) fn descriptor(&self) -> Option<&Descriptor> {
        match &self.source {
            FiberSource::Root(_) => None,
            FiberSource::Host(descriptor) => Some(descriptor),
        }
    }

    pub(crate) fn kind(&self) -> Option<&NodeType> {
        self.descriptor().map(Descriptor::kind)
    }

    pub(crate) fn props(&self) -> Option<&Props> {
        self.descriptor().map(Descriptor::props)
    }

    pub(crate) fn children_shared(&self) -> Arc<[Descriptor]> {
        match &self.source {
            FiberSource::Root(children) => children.clone(),
            FiberSource::Host(descriptor) => descriptor.shared_children(),
        }
    }
}

pub(crate) struct FiberPool {
    epoch: u32,
    nodes: Vec<Fiber>,
}

impl FiberPool {
    pub(crate) fn new(epoch: u32) -> Self {
        Self {
            epoch,
            nodes: Vec::new(),
        }
    }

    /// Drops every node and retags the pool; previously issued ids go stale.
    pub(crate) fn reset(&mut self, epoch: u32) {
        self.nodes.clear();
        self.epoch = epoch;
    }

    pub(crate) fn alloc(&mut self, fiber: Fiber) -> FiberId {
        let idx = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        debug_assert!(idx != u32::MAX, "fiber pool exhausted");
        self.nodes.push(fiber);
        FiberId {
            idx,
            epoch: self.epoch,
        }
    }

    pub(crate) fn get(&self, id: FiberId) -> Option<&Fiber> {
        if id.epoch != self.epoch {
            return None;
        }
        self.nodes.get(id.idx as usize)
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        if id.epoch != self.epoch {
            return None;
        }
        self.nodes.get_mut(id.idx as usize)
    }

    /// Nearest strict ancestor of `id` that owns a surface handle.
    pub(crate) fn ancestor_handle(&self, id: FiberId) -> Option<SurfaceHandle> {
        let mut cursor = self.get(id)?.parent;
        while let Some(parent) = cursor {
            let fiber = self.get(parent)?;
            if let Some(handle) = fiber.handle {
                return Some(handle);
            }
            cursor = fiber.parent;
        }
        None
    }

    /// Next node in pre-order after `id`, never leaving the subtree of `stop`.
    pub(crate) fn next_in_preorder(
        &self,
        id: FiberId,
        stop: FiberId,
        descend: bool,
    ) -> Option<FiberId> {
        let fiber = self.get(id)?;
        if descend && let Some(child) = fiber.child {
            return Some(child);
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == stop {
                return None;
            }
            let fiber = self.get(current)?;
            if let Some(sibling) = fiber.sibling {
                return Some(sibling);
            }
            cursor = fiber.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdom::element;

    #[test]
    fn ids_go_stale_after_reset() {
        let mut pool = FiberPool::new(1);
        let id = pool.alloc(Fiber::root(element("div").build(), SurfaceHandle(1)));
        assert!(pool.get(id).is_some());
        pool.reset(2);
        assert!(pool.get(id).is_none());
        let reused = pool.alloc(Fiber::root(element("p").build(), SurfaceHandle(1)));
        assert_eq!(reused.idx, id.idx);
        assert_ne!(reused, id);
    }

    #[test]
    fn preorder_walk_stays_inside_stop() {
        let mut pool = FiberPool::new(1);
        let root = pool.alloc(Fiber::root(element("div").build(), SurfaceHandle(1)));
        let a = pool.alloc(Fiber::host(element("a").build(), root, Effect::Placement));
        let b = pool.alloc(Fiber::host(element("b").build(), a, Effect::Placement));
        let c = pool.alloc(Fiber::host(element("c").build(), root, Effect::Placement));
        if let Some(f) = pool.get_mut(root) {
            f.child = Some(a);
        }
        if let Some(f) = pool.get_mut(a) {
            f.child = Some(b);
            f.sibling = Some(c);
        }
        let mut order = Vec::new();
        let mut next = Some(root);
        while let Some(id) = next {
            order.push(id);
            next = pool.next_in_preorder(id, root, true);
        }
        assert_eq!(order, vec![root, a, b, c]);
        assert_eq!(pool.next_in_preorder(a, a, false), None);
    }
}
