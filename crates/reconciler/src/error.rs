use crate::surface::SurfaceError;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    /// A surface call failed while expanding the work tree; the pass was
    /// abandoned and the committed tree is unchanged.
    Render(SurfaceError),
    /// The surface rejected the commit batch; the work tree was discarded and
    /// the previously committed tree is still current.
    Commit(SurfaceError),
}

impl ReconcileError {
    pub fn surface_error(&self) -> &SurfaceError {
        match self {
            ReconcileError::Render(err) | ReconcileError::Commit(err) => err,
        }
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::Render(err) => write!(f, "render phase failed: {err}"),
            ReconcileError::Commit(err) => write!(f, "commit failed: {err}"),
        }
    }
}

impl std::error::Error for ReconcileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.surface_error())
    }
}
