//! Positional child matching.
//!
//! Previous children and next descriptors are walked in lockstep by index.
//! There is no keying and no lookahead, so inserting or removing near the head
//! of a list shifts every later position.

use crate::fiber::{Effect, Fiber, FiberId, FiberPool};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ChildDiff {
    pub(crate) updates: usize,
    pub(crate) placements: usize,
    pub(crate) deletions: usize,
}

/// Builds the child chain of `parent` in `wip`.
///
/// The previous chain is read through `parent`'s alternate in `current`, which
/// is never modified. Orphaned previous children are appended to `deletions`.
pub(crate) fn reconcile_children(
    current: &FiberPool,
    wip: &mut FiberPool,
    parent: FiberId,
    deletions: &mut Vec<FiberId>,
) -> ChildDiff {
    let mut stats = ChildDiff::default();
    let Some(parent_fiber) = wip.get(parent) else {
        debug_assert!(false, "reconcile_children on unknown fiber {parent:?}");
        return stats;
    };
    let descriptors = parent_fiber.children_shared();
    let mut old = parent_fiber
        .alternate
        .and_then(|alt| current.get(alt))
        .and_then(|alt| alt.child);

    let mut index = 0;
    let mut prev_new: Option<FiberId> = None;
    loop {
        let next = descriptors.get(index);
        if next.is_none() && old.is_none() {
            break;
        }
        let old_fiber = old.and_then(|id| current.get(id).map(|f| (id, f)));

        let produced = match (old_fiber, next) {
            (Some((old_id, old_fiber)), Some(next))
                if old_fiber.kind() == Some(next.kind()) =>
            {
                stats.updates += 1;
                let mut fiber = Fiber::host(next.clone(), parent, Effect::Update);
                fiber.handle = old_fiber.handle;
                fiber.alternate = Some(old_id);
                Some(wip.alloc(fiber))
            }
            (old_fiber, next) => {
                if let Some((old_id, _)) = old_fiber {
                    stats.deletions += 1;
                    deletions.push(old_id);
                }
                next.map(|next| {
                    stats.placements += 1;
                    wip.alloc(Fiber::host(next.clone(), parent, Effect::Placement))
                })
            }
        };

        if let Some(id) = produced {
            match prev_new {
                None => {
                    if let Some(p) = wip.get_mut(parent) {
                        p.child = Some(id);
                    }
                }
                Some(prev) => {
                    if let Some(p) = wip.get_mut(prev) {
                        p.sibling = Some(id);
                    }
                }
            }
            prev_new = Some(id);
        }

        old = old_fiber.and_then(|(_, f)| f.sibling);
        index += 1;
    }

    if stats.placements + stats.deletions != 0 {
        log::trace!(
            target: "reconcile.diff",
            "children of {parent:?}: {} update(s), {} placement(s), {} deletion(s)",
            stats.updates,
            stats.placements,
            stats.deletions
        );
    }
    stats
}
