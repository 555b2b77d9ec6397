use core_types::SurfaceHandle;
use reconciler::{Mutation, Surface, SurfaceError};
use std::fmt;
use vdom::{Behavior, NodeType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    Create,
    SetProperty,
    ClearProperty,
    Bind,
    Unbind,
    Insert,
    Remove,
}

/// One surface call, as observed by [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceOp {
    Create {
        handle: SurfaceHandle,
        tag: String,
    },
    SetProperty {
        handle: SurfaceHandle,
        name: String,
        value: String,
    },
    ClearProperty {
        handle: SurfaceHandle,
        name: String,
    },
    Bind {
        handle: SurfaceHandle,
        event: String,
    },
    Unbind {
        handle: SurfaceHandle,
        event: String,
    },
    Insert {
        parent: SurfaceHandle,
        child: SurfaceHandle,
        before: Option<SurfaceHandle>,
    },
    Remove {
        parent: SurfaceHandle,
        child: SurfaceHandle,
    },
}

impl SurfaceOp {
    pub fn kind(&self) -> OpKind {
        match self {
            SurfaceOp::Create { .. } => OpKind::Create,
            SurfaceOp::SetProperty { .. } => OpKind::SetProperty,
            SurfaceOp::ClearProperty { .. } => OpKind::ClearProperty,
            SurfaceOp::Bind { .. } => OpKind::Bind,
            SurfaceOp::Unbind { .. } => OpKind::Unbind,
            SurfaceOp::Insert { .. } => OpKind::Insert,
            SurfaceOp::Remove { .. } => OpKind::Remove,
        }
    }

    fn from_mutation(mutation: &Mutation) -> Self {
        match mutation {
            Mutation::SetProperty {
                handle,
                name,
                value,
            } => SurfaceOp::SetProperty {
                handle: *handle,
                name: name.to_string(),
                value: value.clone(),
            },
            Mutation::ClearProperty { handle, name } => SurfaceOp::ClearProperty {
                handle: *handle,
                name: name.to_string(),
            },
            Mutation::BindBehavior { handle, event, .. } => SurfaceOp::Bind {
                handle: *handle,
                event: event.to_string(),
            },
            Mutation::UnbindBehavior { handle, event, .. } => SurfaceOp::Unbind {
                handle: *handle,
                event: event.to_string(),
            },
            Mutation::InsertChild {
                parent,
                child,
                before,
            } => SurfaceOp::Insert {
                parent: *parent,
                child: *child,
                before: *before,
            },
            Mutation::RemoveChild { parent, child } => SurfaceOp::Remove {
                parent: *parent,
                child: *child,
            },
        }
    }
}

impl fmt::Display for SurfaceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceOp::Create { handle, tag } => write!(f, "create {tag} {handle}"),
            SurfaceOp::SetProperty {
                handle,
                name,
                value,
            } => write!(f, "set {handle} {name}={value:?}"),
            SurfaceOp::ClearProperty { handle, name } => write!(f, "clear {handle} {name}"),
            SurfaceOp::Bind { handle, event } => write!(f, "bind {handle} {event}"),
            SurfaceOp::Unbind { handle, event } => write!(f, "unbind {handle} {event}"),
            SurfaceOp::Insert {
                parent,
                child,
                before: Some(before),
            } => write!(f, "insert {child} into {parent} before {before}"),
            SurfaceOp::Insert { parent, child, .. } => write!(f, "insert {child} into {parent}"),
            SurfaceOp::Remove { parent, child } => write!(f, "remove {child} from {parent}"),
        }
    }
}

/// Wraps a surface, logging every call that reaches it and optionally
/// failing the `nth` call of one kind.
///
/// Batches are checked against the injected fault before anything is
/// forwarded, so a faulted batch never reaches the inner surface.
pub struct RecordingSurface<S> {
    inner: S,
    ops: Vec<SurfaceOp>,
    attempts: [usize; 7],
    fault: Option<(OpKind, usize)>,
    rejected_batches: usize,
}

impl<S: Surface> RecordingSurface<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            ops: Vec::new(),
            attempts: [0; 7],
            fault: None,
            rejected_batches: 0,
        }
    }

    /// Fails the `nth` (zero-based, counted from now) call of `kind`, once.
    pub fn inject_fault(&mut self, kind: OpKind, nth: usize) {
        self.attempts[kind as usize] = 0;
        self.fault = Some((kind, nth));
    }

    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn count(&self, kind: OpKind) -> usize {
        self.ops.iter().filter(|op| op.kind() == kind).count()
    }

    pub fn rejected_batches(&self) -> usize {
        self.rejected_batches
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn attempt(&mut self, kind: OpKind) -> Result<(), SurfaceError> {
        let seen = self.attempts[kind as usize];
        self.attempts[kind as usize] = seen + 1;
        match self.fault {
            Some((fault_kind, nth)) if fault_kind == kind && nth == seen => {
                self.fault = None;
                log::debug!(target: "surface.store", "injected fault on {kind:?} #{nth}");
                Err(SurfaceError::Rejected(format!("injected fault on {kind:?} #{nth}")))
            }
            _ => Ok(()),
        }
    }
}

fn mutation_kind(mutation: &Mutation) -> OpKind {
    match mutation {
        Mutation::SetProperty { .. } => OpKind::SetProperty,
        Mutation::ClearProperty { .. } => OpKind::ClearProperty,
        Mutation::BindBehavior { .. } => OpKind::Bind,
        Mutation::UnbindBehavior { .. } => OpKind::Unbind,
        Mutation::InsertChild { .. } => OpKind::Insert,
        Mutation::RemoveChild { .. } => OpKind::Remove,
    }
}

impl<S: Surface> Surface for RecordingSurface<S> {
    fn create_handle(&mut self, kind: &NodeType) -> Result<SurfaceHandle, SurfaceError> {
        self.attempt(OpKind::Create)?;
        let handle = self.inner.create_handle(kind)?;
        self.ops.push(SurfaceOp::Create {
            handle,
            tag: kind.tag().to_string(),
        });
        Ok(handle)
    }

    fn set_property(
        &mut self,
        handle: SurfaceHandle,
        name: &str,
        value: &str,
    ) -> Result<(), SurfaceError> {
        self.attempt(OpKind::SetProperty)?;
        self.inner.set_property(handle, name, value)?;
        self.ops.push(SurfaceOp::SetProperty {
            handle,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn clear_property(&mut self, handle: SurfaceHandle, name: &str) -> Result<(), SurfaceError> {
        self.attempt(OpKind::ClearProperty)?;
        self.inner.clear_property(handle, name)?;
        self.ops.push(SurfaceOp::ClearProperty {
            handle,
            name: name.to_string(),
        });
        Ok(())
    }

    fn bind_behavior(
        &mut self,
        handle: SurfaceHandle,
        event: &str,
        behavior: &Behavior,
    ) -> Result<(), SurfaceError> {
        self.attempt(OpKind::Bind)?;
        self.inner.bind_behavior(handle, event, behavior)?;
        self.ops.push(SurfaceOp::Bind {
            handle,
            event: event.to_string(),
        });
        Ok(())
    }

    fn unbind_behavior(
        &mut self,
        handle: SurfaceHandle,
        event: &str,
        behavior: &Behavior,
    ) -> Result<(), SurfaceError> {
        self.attempt(OpKind::Unbind)?;
        self.inner.unbind_behavior(handle, event, behavior)?;
        self.ops.push(SurfaceOp::Unbind {
            handle,
            event: event.to_string(),
        });
        Ok(())
    }

    fn insert_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
        before: Option<SurfaceHandle>,
    ) -> Result<(), SurfaceError> {
        self.attempt(OpKind::Insert)?;
        self.inner.insert_child(parent, child, before)?;
        self.ops.push(SurfaceOp::Insert {
            parent,
            child,
            before,
        });
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
    ) -> Result<(), SurfaceError> {
        self.attempt(OpKind::Remove)?;
        self.inner.remove_child(parent, child)?;
        self.ops.push(SurfaceOp::Remove { parent, child });
        Ok(())
    }

    fn apply(&mut self, batch: &[Mutation]) -> Result<(), SurfaceError> {
        for mutation in batch {
            if let Err(err) = self.attempt(mutation_kind(mutation)) {
                self.rejected_batches += 1;
                return Err(err);
            }
        }
        if let Err(err) = self.inner.apply(batch) {
            self.rejected_batches += 1;
            return Err(err);
        }
        self.ops.extend(batch.iter().map(SurfaceOp::from_mutation));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SurfaceStore;
    use std::sync::Arc;

    #[test]
    fn faulted_batch_never_reaches_inner_surface() {
        let mut store = SurfaceStore::new();
        let root = store.create_container();
        let mut surface = RecordingSurface::new(store);
        let child = match surface.create_handle(&NodeType::element("p")) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        };
        surface.inject_fault(OpKind::SetProperty, 0);
        let batch = vec![
            Mutation::InsertChild {
                parent: root,
                child,
                before: None,
            },
            Mutation::SetProperty {
                handle: child,
                name: Arc::from("id"),
                value: "x".to_string(),
            },
        ];
        assert!(surface.apply(&batch).is_err());
        assert_eq!(surface.rejected_batches(), 1);
        assert!(surface.inner().children(root).is_empty());
        assert_eq!(surface.count(OpKind::Insert), 0);

        assert_eq!(surface.apply(&batch), Ok(()));
        assert_eq!(surface.inner().children(root), [child]);
        assert_eq!(
            surface.ops().last().map(ToString::to_string),
            Some(format!("set {child} id=\"x\""))
        );
    }

    #[test]
    fn direct_calls_are_logged_in_order() {
        let mut surface = RecordingSurface::new(SurfaceStore::new());
        let leaf = match surface.create_handle(&NodeType::Text) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        };
        assert_eq!(surface.set_property(leaf, "nodeValue", "hi"), Ok(()));
        let kinds: Vec<_> = surface.take_ops().iter().map(SurfaceOp::kind).collect();
        assert_eq!(kinds, [OpKind::Create, OpKind::SetProperty]);
        assert!(surface.ops().is_empty());
    }
}
