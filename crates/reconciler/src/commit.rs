//! Commit planning: turns a finished work tree into one mutation batch.

use crate::fiber::{Effect, FiberId, FiberPool};
use crate::props::diff_props;
use crate::surface::Mutation;
use core_types::{RenderGeneration, SurfaceHandle};

/// What a successful commit did to the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub generation: RenderGeneration,
    pub placements: usize,
    pub updates: usize,
    pub deletions: usize,
    /// Total mutations in the batch.
    pub mutations: usize,
    /// Property and listener mutations produced by `UPDATE` patches.
    pub property_writes: usize,
}

impl CommitSummary {
    /// True when the pass changed nothing on the surface.
    pub fn is_noop(&self) -> bool {
        self.mutations == 0
    }
}

pub(crate) struct CommitPlan {
    pub(crate) batch: Vec<Mutation>,
    pub(crate) summary: CommitSummary,
}

/// Orders removals first, then a pre-order walk below `root` emitting
/// insertions for placed nodes and property patches for updated ones.
pub(crate) fn plan_commit(
    current: &FiberPool,
    wip: &FiberPool,
    root: FiberId,
    deletions: &[FiberId],
    generation: RenderGeneration,
) -> CommitPlan {
    let mut batch = Vec::new();
    let mut summary = CommitSummary {
        generation,
        ..CommitSummary::default()
    };

    for &id in deletions {
        let child = current.get(id).and_then(|f| f.handle);
        let parent = current.ancestor_handle(id);
        match (parent, child) {
            (Some(parent), Some(child)) => {
                summary.deletions += 1;
                batch.push(Mutation::RemoveChild { parent, child });
            }
            _ => {
                debug_assert!(false, "deleted fiber {id:?} without attached handle");
                log::warn!(target: "reconcile.commit", "skipping deletion of detached {id:?}");
            }
        }
    }

    let mut cursor = wip.next_in_preorder(root, root, true);
    while let Some(id) = cursor {
        let Some(fiber) = wip.get(id) else {
            break;
        };
        match fiber.effect {
            Effect::Placement => {
                match (wip.ancestor_handle(id), fiber.handle) {
                    (Some(parent), Some(child)) => {
                        summary.placements += 1;
                        batch.push(Mutation::InsertChild {
                            parent,
                            child,
                            before: insertion_anchor(wip, fiber.sibling),
                        });
                    }
                    _ => {
                        debug_assert!(false, "placed fiber {id:?} without handle");
                    }
                }
            }
            Effect::Update => {
                summary.updates += 1;
                let prev = fiber
                    .alternate
                    .and_then(|alt| current.get(alt))
                    .and_then(|alt| alt.props());
                if let (Some(handle), Some(kind), Some(prev), Some(next)) =
                    (fiber.handle, fiber.kind(), prev, fiber.props())
                {
                    summary.property_writes += diff_props(handle, kind, prev, next, &mut batch);
                }
            }
            Effect::Deletion | Effect::None => {}
        }
        cursor = wip.next_in_preorder(id, root, true);
    }

    summary.mutations = batch.len();
    CommitPlan { batch, summary }
}

/// First following sibling that is already attached, so a placed node lands
/// in front of it rather than at the end of the parent.
fn insertion_anchor(wip: &FiberPool, mut sibling: Option<FiberId>) -> Option<SurfaceHandle> {
    while let Some(id) = sibling {
        let fiber = wip.get(id)?;
        if fiber.effect == Effect::Update {
            return fiber.handle;
        }
        sibling = fiber.sibling;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::reconcile_children;
    use crate::fiber::Fiber;
    use vdom::element;

    #[test]
    fn placement_before_updated_sibling_is_anchored() {
        let mut current = FiberPool::new(1);
        let root = current.alloc(Fiber::root(element("p").build(), SurfaceHandle(1)));
        let mut old = Fiber::host(element("p").build(), root, Effect::Placement);
        old.handle = Some(SurfaceHandle(10));
        let old = current.alloc(old);
        if let Some(f) = current.get_mut(root) {
            f.child = Some(old);
        }

        // next generation: [span, p] under a root with two children
        let mut wip = FiberPool::new(2);
        let mut next_root = Fiber::root(element("p").build(), SurfaceHandle(1));
        next_root.alternate = Some(root);
        let next_root = wip.alloc(next_root);
        let span = {
            let mut f = Fiber::host(element("span").build(), next_root, Effect::Placement);
            f.handle = Some(SurfaceHandle(11));
            wip.alloc(f)
        };
        let p = {
            let mut f = Fiber::host(element("p").build(), next_root, Effect::Update);
            f.handle = Some(SurfaceHandle(10));
            f.alternate = Some(old);
            wip.alloc(f)
        };
        if let Some(f) = wip.get_mut(next_root) {
            f.child = Some(span);
        }
        if let Some(f) = wip.get_mut(span) {
            f.sibling = Some(p);
        }

        let plan = plan_commit(&current, &wip, next_root, &[], RenderGeneration(1));
        assert_eq!(
            plan.batch,
            vec![Mutation::InsertChild {
                parent: SurfaceHandle(1),
                child: SurfaceHandle(11),
                before: Some(SurfaceHandle(10)),
            }]
        );
        assert_eq!(plan.summary.placements, 1);
        assert_eq!(plan.summary.updates, 1);
        assert_eq!(plan.summary.property_writes, 0);
    }

    #[test]
    fn removals_precede_everything_else() {
        let mut current = FiberPool::new(1);
        let root = current.alloc(Fiber::root(element("p").build(), SurfaceHandle(1)));
        let mut old = Fiber::host(element("p").build(), root, Effect::Placement);
        old.handle = Some(SurfaceHandle(10));
        let old = current.alloc(old);
        if let Some(f) = current.get_mut(root) {
            f.child = Some(old);
        }

        let mut wip = FiberPool::new(2);
        let mut next_root = Fiber::root(element("div").build(), SurfaceHandle(1));
        next_root.alternate = Some(root);
        let next_root = wip.alloc(next_root);
        let mut deletions = Vec::new();
        reconcile_children(&current, &mut wip, next_root, &mut deletions);
        if let Some(child) = wip.get(next_root).and_then(|f| f.child) {
            if let Some(f) = wip.get_mut(child) {
                f.handle = Some(SurfaceHandle(20));
            }
        }

        let plan = plan_commit(&current, &wip, next_root, &deletions, RenderGeneration(2));
        assert_eq!(
            plan.batch,
            vec![
                Mutation::RemoveChild {
                    parent: SurfaceHandle(1),
                    child: SurfaceHandle(10),
                },
                Mutation::InsertChild {
                    parent: SurfaceHandle(1),
                    child: SurfaceHandle(20),
                    before: None,
                },
            ]
        );
        assert_eq!(plan.summary.deletions, 1);
        assert_eq!(plan.summary.mutations, 2);
    }
}
