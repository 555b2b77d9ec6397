use std::fmt;

pub type RootId = u64;

/// Opaque handle to one primitive owned by a rendering surface.
///
/// The reconciler never interprets the value; surfaces allocate them and must
/// not reuse a released handle for the lifetime of the surface.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub u64);

impl SurfaceHandle {
    /// Reserved sentinel for "no handle".
    pub const INVALID: SurfaceHandle = SurfaceHandle(0);

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SurfaceHandle({})", self.0)
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic counter of committed generations for one render root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderGeneration(pub u64);

impl RenderGeneration {
    pub const INITIAL: RenderGeneration = RenderGeneration(0);

    pub fn next(self) -> Self {
        RenderGeneration(self.0.saturating_add(1))
    }
}

impl fmt::Display for RenderGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_monotonic() {
        let g = RenderGeneration::INITIAL;
        assert_eq!(g.next(), RenderGeneration(1));
        assert_eq!(RenderGeneration(u64::MAX).next(), RenderGeneration(u64::MAX));
    }

    #[test]
    fn invalid_handle_is_zero() {
        assert!(!SurfaceHandle::INVALID.is_valid());
        assert!(SurfaceHandle(7).is_valid());
        assert_eq!(SurfaceHandle(7).to_string(), "#7");
    }
}
