//! Cooperative work loop and session state.
//!
//! A pass is started by [`Reconciler::schedule_render`] and driven by repeated
//! [`Reconciler::resume`] calls, typically one per host idle slice. Suspension
//! only happens between units; a unit (create handle if needed, diff children)
//! always runs to completion. When the last unit finishes, the same `resume`
//! call commits.

use crate::commit::{CommitSummary, plan_commit};
use crate::diff::reconcile_children;
use crate::error::ReconcileError;
use crate::fiber::{Fiber, FiberId, FiberPool};
use crate::props::initial_props;
use crate::surface::{Surface, SurfaceError, apply_mutation};
use core_types::{RenderGeneration, SurfaceHandle};
use std::time::{Duration, Instant};
use vdom::Descriptor;

/// Host-provided budget signal, polled after every unit of work.
pub trait Deadline {
    fn should_yield(&mut self) -> bool;
}

/// Wall-clock slice: yields once less than `threshold` remains.
#[derive(Clone, Copy, Debug)]
pub struct TimeBudget {
    deadline: Instant,
    threshold: Duration,
}

impl TimeBudget {
    pub fn new(slice: Duration) -> Self {
        Self::with_threshold(slice, DEFAULT_YIELD_THRESHOLD)
    }

    pub fn with_threshold(slice: Duration, threshold: Duration) -> Self {
        Self::until(Instant::now() + slice, threshold)
    }

    pub fn until(deadline: Instant, threshold: Duration) -> Self {
        Self {
            deadline,
            threshold,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl Deadline for TimeBudget {
    fn should_yield(&mut self) -> bool {
        self.remaining() < self.threshold
    }
}

/// Deterministic budget: yields after `units` units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitBudget {
    remaining: usize,
}

impl UnitBudget {
    pub fn new(units: usize) -> Self {
        Self { remaining: units }
    }
}

impl Deadline for UnitBudget {
    fn should_yield(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn should_yield(&mut self) -> bool {
        false
    }
}

pub const DEFAULT_YIELD_THRESHOLD: Duration = Duration::from_millis(1);

const OUTLINE_LOG_LINES: usize = 16;

#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    /// Hard cap on units per `resume` call, independent of the deadline.
    pub max_units_per_slice: Option<usize>,
    /// Remaining-time threshold used by [`Reconciler::resume_idle`].
    pub yield_threshold: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_units_per_slice: None,
            yield_threshold: DEFAULT_YIELD_THRESHOLD,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcilerStats {
    pub passes_started: u64,
    pub passes_abandoned: u64,
    pub passes_committed: u64,
    pub render_failures: u64,
    pub commits_failed: u64,
    pub units_processed: u64,
    pub slices: u64,
    pub yields: u64,
    /// Handles created for work trees that never committed.
    pub leaked_handles: u64,
}

/// Outcome of one `resume` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkStatus {
    /// No pass is in flight.
    Idle,
    /// The budget ran out with work left; call `resume` again.
    Suspended { units: usize },
    Committed(CommitSummary),
}

/// Per-root reconciliation state: two fiber pools, one holding the committed
/// tree and one the tree under construction.
struct ReconcilerSession {
    pools: [FiberPool; 2],
    current: usize,
    current_root: Option<FiberId>,
    wip_root: Option<FiberId>,
    next_unit: Option<FiberId>,
    deletions: Vec<FiberId>,
    next_epoch: u32,
    generation: RenderGeneration,
    created_handles: u64,
}

fn split_pools(pools: &mut [FiberPool; 2], current: usize) -> (&FiberPool, &mut FiberPool) {
    let [a, b] = pools;
    if current == 0 { (&*a, b) } else { (&*b, a) }
}

impl ReconcilerSession {
    fn new() -> Self {
        Self {
            pools: [FiberPool::new(1), FiberPool::new(2)],
            current: 0,
            current_root: None,
            wip_root: None,
            next_unit: None,
            deletions: Vec::new(),
            next_epoch: 3,
            generation: RenderGeneration::INITIAL,
            created_handles: 0,
        }
    }

    fn take_epoch(&mut self) -> u32 {
        let epoch = self.next_epoch;
        self.next_epoch = self.next_epoch.wrapping_add(1).max(1);
        epoch
    }

    fn current_pool(&self) -> &FiberPool {
        &self.pools[self.current]
    }

    fn reset_wip(&mut self) {
        let epoch = self.take_epoch();
        self.pools[1 - self.current].reset(epoch);
    }

    fn begin_pass(&mut self, descriptor: Descriptor, container: SurfaceHandle) -> FiberId {
        self.reset_wip();
        self.deletions.clear();
        // A different container is a fresh mount; nothing is diffed against
        // the tree committed elsewhere, and that tree leaves its container.
        let alternate = match self.current_root {
            Some(previous) if self.root_container(previous) == Some(container) => Some(previous),
            Some(previous) => {
                self.evict_root_children(previous);
                None
            }
            None => None,
        };
        let mut root = Fiber::root(descriptor, container);
        root.alternate = alternate;
        let (_, wip) = split_pools(&mut self.pools, self.current);
        let root = wip.alloc(root);
        self.wip_root = Some(root);
        self.next_unit = Some(root);
        self.created_handles = 0;
        root
    }

    fn root_container(&self, root: FiberId) -> Option<SurfaceHandle> {
        self.current_pool().get(root).and_then(|f| f.handle)
    }

    /// Queues every committed child of `root` for removal from its container.
    fn evict_root_children(&mut self, root: FiberId) {
        let pool = &self.pools[self.current];
        let mut cursor = pool.get(root).and_then(|f| f.child);
        while let Some(id) = cursor {
            self.deletions.push(id);
            cursor = pool.get(id).and_then(|f| f.sibling);
        }
        if !self.deletions.is_empty() {
            log::debug!(
                target: "reconcile.scheduler",
                "container changed; removing {} committed child(ren)",
                self.deletions.len()
            );
        }
    }

    /// Drops the work tree; returns how many handles it had created.
    fn discard_pass(&mut self) -> u64 {
        self.wip_root = None;
        self.next_unit = None;
        self.deletions.clear();
        self.reset_wip();
        std::mem::take(&mut self.created_handles)
    }

    fn promote(&mut self, root: FiberId, generation: RenderGeneration) {
        self.current = 1 - self.current;
        self.current_root = Some(root);
        self.generation = generation;
        self.wip_root = None;
        self.next_unit = None;
        self.deletions.clear();
        self.created_handles = 0;
        // The previous generation is released here; stale alternates in the
        // new current tree now resolve to nothing.
        self.reset_wip();
    }
}

pub struct Reconciler<S: Surface> {
    surface: S,
    session: ReconcilerSession,
    config: ReconcilerConfig,
    stats: ReconcilerStats,
}

impl<S: Surface> Reconciler<S> {
    pub fn new(surface: S) -> Self {
        Self::with_config(surface, ReconcilerConfig::default())
    }

    pub fn with_config(surface: S, config: ReconcilerConfig) -> Self {
        Self {
            surface,
            session: ReconcilerSession::new(),
            config,
            stats: ReconcilerStats::default(),
        }
    }

    /// Starts a pass rendering `descriptor` as the sole child of `container`.
    ///
    /// A pass already in flight is abandoned: its work tree is discarded,
    /// never partially committed, and any handles it created stay detached.
    pub fn schedule_render(&mut self, descriptor: Descriptor, container: SurfaceHandle) {
        if self.session.wip_root.is_some() {
            let leaked = self.session.created_handles;
            self.stats.passes_abandoned = self.stats.passes_abandoned.saturating_add(1);
            self.stats.leaked_handles = self.stats.leaked_handles.saturating_add(leaked);
            log::warn!(
                target: "reconcile.scheduler",
                "abandoning in-flight pass; {leaked} detached handle(s) leaked"
            );
        }
        if log::log_enabled!(target: "reconcile.scheduler", log::Level::Trace) {
            for line in vdom::debug::outline(&descriptor, OUTLINE_LOG_LINES) {
                log::trace!(target: "reconcile.scheduler", "  {line}");
            }
        }
        let root = self.session.begin_pass(descriptor, container);
        self.stats.passes_started = self.stats.passes_started.saturating_add(1);
        log::debug!(
            target: "reconcile.scheduler",
            "scheduled render into {container} root={root:?} after {}",
            self.session.generation
        );
    }

    /// Processes units until `deadline` asks to yield or the pass completes.
    ///
    /// At least one unit runs per call, so a pass always makes progress.
    pub fn resume<D: Deadline + ?Sized>(
        &mut self,
        deadline: &mut D,
    ) -> Result<WorkStatus, ReconcileError> {
        let Some(root) = self.session.wip_root else {
            return Ok(WorkStatus::Idle);
        };
        self.stats.slices = self.stats.slices.saturating_add(1);
        let mut units = 0usize;
        while let Some(unit) = self.session.next_unit {
            match self.process_unit(unit, root) {
                Ok(next) => self.session.next_unit = next,
                Err(err) => {
                    let leaked = self.session.discard_pass();
                    self.stats.render_failures = self.stats.render_failures.saturating_add(1);
                    self.stats.leaked_handles = self.stats.leaked_handles.saturating_add(leaked);
                    log::error!(
                        target: "reconcile.scheduler",
                        "render pass failed at {unit:?}: {err}"
                    );
                    return Err(ReconcileError::Render(err));
                }
            }
            units += 1;
            self.stats.units_processed = self.stats.units_processed.saturating_add(1);
            if self.session.next_unit.is_none() {
                break;
            }
            let capped = self
                .config
                .max_units_per_slice
                .is_some_and(|cap| units >= cap);
            if capped || deadline.should_yield() {
                self.stats.yields = self.stats.yields.saturating_add(1);
                log::trace!(
                    target: "reconcile.scheduler",
                    "yielding after {units} unit(s), next={:?}",
                    self.session.next_unit
                );
                return Ok(WorkStatus::Suspended { units });
            }
        }
        self.commit(root).map(WorkStatus::Committed)
    }

    /// One idle slice of `slice` length, using the configured yield threshold.
    pub fn resume_idle(&mut self, slice: Duration) -> Result<WorkStatus, ReconcileError> {
        let mut budget = TimeBudget::with_threshold(slice, self.config.yield_threshold);
        self.resume(&mut budget)
    }

    /// Drains the pending pass in a single call. `Ok(None)` when idle.
    pub fn run_to_completion(&mut self) -> Result<Option<CommitSummary>, ReconcileError> {
        loop {
            match self.resume(&mut Unbounded)? {
                WorkStatus::Idle => return Ok(None),
                WorkStatus::Committed(summary) => return Ok(Some(summary)),
                // only the per-slice cap can stop an unbounded resume
                WorkStatus::Suspended { .. } => continue,
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.session.wip_root.is_none()
    }

    pub fn generation(&self) -> RenderGeneration {
        self.session.generation
    }

    pub fn stats(&self) -> ReconcilerStats {
        self.stats
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    fn process_unit(
        &mut self,
        id: FiberId,
        root: FiberId,
    ) -> Result<Option<FiberId>, SurfaceError> {
        let Reconciler {
            surface, session, ..
        } = self;
        let ReconcilerSession {
            pools,
            current,
            deletions,
            created_handles,
            ..
        } = session;
        let (current, wip) = split_pools(pools, *current);

        let Some(fiber) = wip.get(id) else {
            debug_assert!(false, "work unit {id:?} not in work pool");
            return Ok(None);
        };
        if fiber.handle.is_none() {
            if let Some(descriptor) = fiber.descriptor().cloned() {
                let handle = surface.create_handle(descriptor.kind())?;
                *created_handles += 1;
                if let Some(fiber) = wip.get_mut(id) {
                    fiber.handle = Some(handle);
                }
                let mut initial = Vec::new();
                initial_props(handle, descriptor.kind(), descriptor.props(), &mut initial);
                for mutation in &initial {
                    apply_mutation(surface, mutation)?;
                }
            }
        }

        reconcile_children(current, wip, id, deletions);
        Ok(wip.next_in_preorder(id, root, true))
    }

    fn commit(&mut self, root: FiberId) -> Result<CommitSummary, ReconcileError> {
        let generation = self.session.generation.next();
        let plan = {
            let session = &self.session;
            let current = &session.pools[session.current];
            let wip = &session.pools[1 - session.current];
            plan_commit(current, wip, root, &session.deletions, generation)
        };

        if let Err(err) = self.surface.apply(&plan.batch) {
            let leaked = self.session.discard_pass();
            self.stats.commits_failed = self.stats.commits_failed.saturating_add(1);
            self.stats.leaked_handles = self.stats.leaked_handles.saturating_add(leaked);
            log::error!(
                target: "reconcile.commit",
                "commit of {generation} rejected after planning {} mutation(s): {err}",
                plan.batch.len()
            );
            return Err(ReconcileError::Commit(err));
        }

        self.session.promote(root, generation);
        self.stats.passes_committed = self.stats.passes_committed.saturating_add(1);
        log::debug!(
            target: "reconcile.commit",
            "committed {generation}: placements={} updates={} deletions={} mutations={}",
            plan.summary.placements,
            plan.summary.updates,
            plan.summary.deletions,
            plan.summary.mutations
        );
        Ok(plan.summary)
    }
}
