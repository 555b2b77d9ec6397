//! Boundary between the reconciler and a rendering surface.
//!
//! The reconciler only ever calls the operations below. During the render
//! phase it creates handles and writes their initial properties while they are
//! still detached; everything that touches attached primitives is collected
//! into a [`Mutation`] batch and handed to [`Surface::apply`] at commit.
//!
//! Batch ordering contract:
//! - All `RemoveChild` mutations come first.
//! - Insertions and property patches follow in pre-order of the new tree.
//! - `InsertChild::before`, when set, names a child already attached to
//!   `parent` at the time the mutation is applied.

use core_types::SurfaceHandle;
use std::fmt;
use std::sync::Arc;
use vdom::{Behavior, NodeType};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceError {
    UnknownHandle(SurfaceHandle),
    WrongNodeKind(SurfaceHandle),
    InvalidParent(SurfaceHandle),
    NotAChild {
        parent: SurfaceHandle,
        child: SurfaceHandle,
    },
    CycleDetected {
        parent: SurfaceHandle,
        child: SurfaceHandle,
    },
    Rejected(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::UnknownHandle(handle) => write!(f, "unknown surface handle {handle}"),
            SurfaceError::WrongNodeKind(handle) => {
                write!(f, "operation not supported by node kind of {handle}")
            }
            SurfaceError::InvalidParent(handle) => write!(f, "{handle} cannot take this child"),
            SurfaceError::NotAChild { parent, child } => {
                write!(f, "{child} is not a child of {parent}")
            }
            SurfaceError::CycleDetected { parent, child } => {
                write!(f, "inserting {child} under {parent} would create a cycle")
            }
            SurfaceError::Rejected(reason) => write!(f, "surface rejected operation: {reason}"),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// One surface mutation produced by the committer.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    SetProperty {
        handle: SurfaceHandle,
        name: Arc<str>,
        value: String,
    },
    ClearProperty {
        handle: SurfaceHandle,
        name: Arc<str>,
    },
    BindBehavior {
        handle: SurfaceHandle,
        event: Arc<str>,
        behavior: Behavior,
    },
    UnbindBehavior {
        handle: SurfaceHandle,
        event: Arc<str>,
        behavior: Behavior,
    },
    /// Attach `child` under `parent`, before `before` or at the end.
    InsertChild {
        parent: SurfaceHandle,
        child: SurfaceHandle,
        before: Option<SurfaceHandle>,
    },
    /// Detach `child` from `parent` and release its subtree.
    RemoveChild {
        parent: SurfaceHandle,
        child: SurfaceHandle,
    },
}

impl Mutation {
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Mutation::InsertChild { .. } | Mutation::RemoveChild { .. }
        )
    }

    /// Handle whose state the mutation changes.
    pub fn target(&self) -> SurfaceHandle {
        match self {
            Mutation::SetProperty { handle, .. }
            | Mutation::ClearProperty { handle, .. }
            | Mutation::BindBehavior { handle, .. }
            | Mutation::UnbindBehavior { handle, .. } => *handle,
            Mutation::InsertChild { parent, .. } | Mutation::RemoveChild { parent, .. } => *parent,
        }
    }
}

pub trait Surface {
    /// Allocates a detached primitive; `NodeType::Text` yields a text leaf.
    fn create_handle(&mut self, kind: &NodeType) -> Result<SurfaceHandle, SurfaceError>;

    /// Sets an attribute, or the text content when `name` is `nodeValue` on a
    /// text leaf.
    fn set_property(
        &mut self,
        handle: SurfaceHandle,
        name: &str,
        value: &str,
    ) -> Result<(), SurfaceError>;

    fn clear_property(&mut self, handle: SurfaceHandle, name: &str) -> Result<(), SurfaceError>;

    fn bind_behavior(
        &mut self,
        handle: SurfaceHandle,
        event: &str,
        behavior: &Behavior,
    ) -> Result<(), SurfaceError>;

    fn unbind_behavior(
        &mut self,
        handle: SurfaceHandle,
        event: &str,
        behavior: &Behavior,
    ) -> Result<(), SurfaceError>;

    fn insert_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
        before: Option<SurfaceHandle>,
    ) -> Result<(), SurfaceError>;

    fn remove_child(
        &mut self,
        parent: SurfaceHandle,
        child: SurfaceHandle,
    ) -> Result<(), SurfaceError>;

    /// Applies a commit batch.
    ///
    /// The default replays mutations in order and stops at the first failure,
    /// leaving earlier mutations applied. Surfaces that can validate a batch
    /// up front should override this to make commits all-or-nothing.
    fn apply(&mut self, batch: &[Mutation]) -> Result<(), SurfaceError> {
        for mutation in batch {
            apply_mutation(self, mutation)?;
        }
        Ok(())
    }
}

pub fn apply_mutation<S: Surface + ?Sized>(
    surface: &mut S,
    mutation: &Mutation,
) -> Result<(), SurfaceError> {
    match mutation {
        Mutation::SetProperty {
            handle,
            name,
            value,
        } => surface.set_property(*handle, name, value),
        Mutation::ClearProperty { handle, name } => surface.clear_property(*handle, name),
        Mutation::BindBehavior {
            handle,
            event,
            behavior,
        } => surface.bind_behavior(*handle, event, behavior),
        Mutation::UnbindBehavior {
            handle,
            event,
            behavior,
        } => surface.unbind_behavior(*handle, event, behavior),
        Mutation::InsertChild {
            parent,
            child,
            before,
        } => surface.insert_child(*parent, *child, *before),
        Mutation::RemoveChild { parent, child } => surface.remove_child(*parent, *child),
    }
}
