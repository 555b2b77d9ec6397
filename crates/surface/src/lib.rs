//! Rendering surfaces for the reconciler.
//!
//! [`SurfaceStore`] is an in-memory node arena with transactional batch
//! application. [`RecordingSurface`] wraps any surface to log and fault-inject
//! the calls the reconciler makes.

mod recording;
mod store;

pub use crate::recording::{OpKind, RecordingSurface, SurfaceOp};
pub use crate::store::SurfaceStore;
