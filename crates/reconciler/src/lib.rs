//! Incremental tree reconciliation.
//!
//! A render request is expanded into a work tree one unit at a time, diffing
//! each node's children positionally against the last committed tree. Nothing
//! attached to the surface is touched until the whole tree has been diffed;
//! the commit then hands one ordered [`Mutation`] batch to the [`Surface`].
//!
//! Two fiber pools back the committed and in-progress trees. Cross-generation
//! links are epoch-tagged ids, so a pool reset invalidates every id into it.

mod commit;
mod diff;
mod error;
mod fiber;
mod props;
mod scheduler;
pub mod surface;

#[cfg(test)]
mod mock;

pub use crate::commit::CommitSummary;
pub use crate::error::ReconcileError;
pub use crate::fiber::Effect;
pub use crate::props::{diff_props, initial_props};
pub use crate::scheduler::{
    DEFAULT_YIELD_THRESHOLD, Deadline, Reconciler, ReconcilerConfig, ReconcilerStats, TimeBudget,
    UnitBudget, Unbounded, WorkStatus,
};
pub use crate::surface::{Mutation, Surface, SurfaceError, apply_mutation};
