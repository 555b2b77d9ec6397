use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bus::{RenderCommand, RenderEvent};
use core_types::{RootId, SurfaceHandle};
use reconciler::{Reconciler, ReconcilerConfig, WorkStatus};
use surface::SurfaceStore;

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Length of one idle slice handed to the reconciler.
    pub slice: Duration,
    /// Pause between slices while work is pending, standing in for the time
    /// the host spends on other work.
    pub idle_gap: Duration,
    pub reconciler: ReconcilerConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            slice: Duration::from_millis(4),
            idle_gap: Duration::ZERO,
            reconciler: ReconcilerConfig::default(),
        }
    }
}

struct RootState {
    reconciler: Reconciler<SurfaceStore>,
    container: SurfaceHandle,
}

impl RootState {
    fn new(config: &ReconcilerConfig) -> Self {
        let mut store = SurfaceStore::new();
        let container = store.create_container();
        Self {
            reconciler: Reconciler::with_config(store, config.clone()),
            container,
        }
    }

    fn resolve_path(&self, path: &[usize]) -> Option<SurfaceHandle> {
        let store = self.reconciler.surface();
        let mut node = self.container;
        for &index in path {
            node = *store.children(node).get(index)?;
        }
        Some(node)
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Spawns the render thread. It owns one reconciler and surface per root,
/// blocks on the command channel while idle, and interleaves queued commands
/// with idle slices while any pass is pending.
pub fn start_render_runtime(
    cmd_rx: Receiver<RenderCommand>,
    evt_tx: Sender<RenderEvent>,
    config: RuntimeConfig,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut roots: HashMap<RootId, RootState> = HashMap::new();

        loop {
            let pending = roots.values().any(|state| !state.reconciler.is_idle());
            let cmd = if pending {
                match cmd_rx.try_recv() {
                    Ok(cmd) => Some(cmd),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match cmd_rx.recv() {
                    Ok(cmd) => Some(cmd),
                    Err(_) => break,
                }
            };

            if let Some(cmd) = cmd {
                match handle_command(cmd, &mut roots, &evt_tx, &config) {
                    Flow::Continue => continue,
                    Flow::Stop => break,
                }
            }

            for (&root, state) in roots.iter_mut() {
                if state.reconciler.is_idle() {
                    continue;
                }
                run_slice(root, state, &evt_tx, config.slice);
            }
            if !config.idle_gap.is_zero() {
                thread::sleep(config.idle_gap);
            }
        }
        log::debug!(target: "runtime.render", "render runtime stopped");
    })
}

fn handle_command(
    cmd: RenderCommand,
    roots: &mut HashMap<RootId, RootState>,
    evt_tx: &Sender<RenderEvent>,
    config: &RuntimeConfig,
) -> Flow {
    match cmd {
        RenderCommand::Render { root, descriptor } => {
            let state = roots
                .entry(root)
                .or_insert_with(|| RootState::new(&config.reconciler));
            state.reconciler.schedule_render(descriptor, state.container);
        }
        RenderCommand::Dispatch {
            root,
            path,
            event,
            value,
        } => {
            let target = roots
                .get(&root)
                .and_then(|state| state.resolve_path(&path).map(|h| (state, h)));
            let listeners = match target {
                Some((state, handle)) => state.reconciler.surface().dispatch(handle, &event, value),
                None => {
                    log::warn!(
                        target: "runtime.render",
                        "dispatch to unknown node root={root} path={path:?}"
                    );
                    0
                }
            };
            let _ = evt_tx.send(RenderEvent::Dispatched {
                root,
                event,
                listeners,
            });
        }
        RenderCommand::Shutdown => return Flow::Stop,
    }
    Flow::Continue
}

fn run_slice(root: RootId, state: &mut RootState, evt_tx: &Sender<RenderEvent>, slice: Duration) {
    match state.reconciler.resume_idle(slice) {
        Ok(WorkStatus::Committed(summary)) => {
            let outline = state.reconciler.surface().snapshot_lines(state.container);
            let _ = evt_tx.send(RenderEvent::Committed {
                root,
                summary,
                outline,
            });
        }
        Ok(WorkStatus::Suspended { units }) => {
            log::trace!(target: "runtime.render", "root {root} suspended after {units} unit(s)");
        }
        Ok(WorkStatus::Idle) => {}
        Err(err) => {
            log::error!(target: "runtime.render", "root {root}: {err}");
            let _ = evt_tx.send(RenderEvent::Failed {
                root,
                error: err.to_string(),
            });
        }
    }
}
