//! TOML render scenarios: a sequence of trees rendered into one container,
//! each step optionally pinning the surface calls, the commit summary and
//! listener dispatches it must produce.

use crate::assert_surface_equivalent;
use crate::tree_text::{BehaviorRegistry, parse_tree};
use core_types::SurfaceHandle;
use reconciler::{CommitSummary, Reconciler, UnitBudget, WorkStatus};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use surface::{RecordingSurface, SurfaceStore};

pub const SCENARIO_FORMAT_V1: &str = "sapwood-scenario-v1";

#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    pub format: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Step {
    pub tree: String,
    /// Exact surface calls, in `SurfaceOp` display form.
    #[serde(default)]
    pub ops: Option<Vec<String>>,
    #[serde(default)]
    pub summary: Option<ExpectedSummary>,
    /// Drive the pass in slices of this many units instead of all at once.
    #[serde(default)]
    pub unit_budget: Option<usize>,
    #[serde(default)]
    pub dispatch: Vec<DispatchStep>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ExpectedSummary {
    pub placements: Option<usize>,
    pub updates: Option<usize>,
    pub deletions: Option<usize>,
    pub mutations: Option<usize>,
}

impl ExpectedSummary {
    pub fn check(&self, summary: &CommitSummary) -> Result<(), String> {
        let fields = [
            ("placements", self.placements, summary.placements),
            ("updates", self.updates, summary.updates),
            ("deletions", self.deletions, summary.deletions),
            ("mutations", self.mutations, summary.mutations),
        ];
        let mismatches: Vec<String> = fields
            .iter()
            .filter_map(|(name, expected, actual)| match expected {
                Some(expected) if expected != actual => {
                    Some(format!("{name}: expected {expected}, got {actual}"))
                }
                _ => None,
            })
            .collect();
        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(mismatches.join("; "))
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DispatchStep {
    /// Child indices from the container.
    pub path: Vec<usize>,
    pub event: String,
    #[serde(default)]
    pub value: Option<String>,
    /// Behavior names expected to fire, in order.
    #[serde(default)]
    pub fired: Vec<String>,
}

pub fn load_scenario(path: &Path) -> Scenario {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read scenario {path:?}: {err}"));
    let scenario: Scenario = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse scenario {path:?}: {err}"));
    assert_eq!(
        scenario.format, SCENARIO_FORMAT_V1,
        "unsupported scenario format in {path:?}"
    );
    assert!(!scenario.steps.is_empty(), "scenario {path:?} has no steps");
    scenario
}

/// Every `*.toml` scenario in `dir`, sorted by file name.
pub fn load_scenarios(dir: &Path) -> Vec<(PathBuf, Scenario)> {
    let entries = fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("failed to read scenario dir {dir:?}: {err}"));
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();
    paths
        .into_iter()
        .map(|path| {
            let scenario = load_scenario(&path);
            (path, scenario)
        })
        .collect()
}

/// Renders every step into a fresh store and checks what each step pins.
pub fn run_scenario(scenario: &Scenario) {
    let mut store = SurfaceStore::new();
    let container = store.create_container();
    let mut reconciler = Reconciler::new(RecordingSurface::new(store));
    let behaviors = BehaviorRegistry::new();

    for (idx, step) in scenario.steps.iter().enumerate() {
        let label = format!("{} step {idx}", scenario.name);
        let tree = parse_tree(&step.tree, &behaviors)
            .unwrap_or_else(|err| panic!("{label}: bad tree: {err}"));
        reconciler.schedule_render(tree.clone(), container);
        let summary = match step.unit_budget {
            Some(units) => drive_sliced(&mut reconciler, units, &label),
            None => match reconciler.run_to_completion() {
                Ok(Some(summary)) => summary,
                Ok(None) => panic!("{label}: scheduled pass did not commit"),
                Err(err) => panic!("{label}: {err}"),
            },
        };

        let ops: Vec<String> = reconciler
            .surface_mut()
            .take_ops()
            .iter()
            .map(ToString::to_string)
            .collect();
        if let Some(expected) = &step.ops {
            crate::assert_lines_eq(&format!("{label} ops"), expected, &ops);
        }
        if let Some(expected) = &step.summary
            && let Err(message) = expected.check(&summary)
        {
            panic!("{label}: summary mismatch: {message} ({summary:?})");
        }
        assert_surface_equivalent(reconciler.surface().inner(), container, &tree, &label);

        for dispatch in &step.dispatch {
            run_dispatch(reconciler.surface().inner(), container, dispatch, &behaviors, &label);
        }
    }
}

fn drive_sliced(
    reconciler: &mut Reconciler<RecordingSurface<SurfaceStore>>,
    units: usize,
    label: &str,
) -> CommitSummary {
    assert!(units > 0, "{label}: unit_budget must be positive");
    loop {
        match reconciler.resume(&mut UnitBudget::new(units)) {
            Ok(WorkStatus::Committed(summary)) => return summary,
            Ok(WorkStatus::Suspended { .. }) => {
                assert_eq!(
                    reconciler.surface().count(surface::OpKind::Insert)
                        + reconciler.surface().count(surface::OpKind::Remove),
                    0,
                    "{label}: structure changed before commit"
                );
            }
            Ok(WorkStatus::Idle) => panic!("{label}: pass vanished before commit"),
            Err(err) => panic!("{label}: {err}"),
        }
    }
}

fn run_dispatch(
    store: &SurfaceStore,
    container: SurfaceHandle,
    dispatch: &DispatchStep,
    behaviors: &BehaviorRegistry,
    label: &str,
) {
    let mut target = container;
    for &index in &dispatch.path {
        target = *store
            .children(target)
            .get(index)
            .unwrap_or_else(|| panic!("{label}: no node at path {:?}", dispatch.path));
    }
    behaviors.take_fired();
    store.dispatch(target, &dispatch.event, dispatch.value.clone());
    assert_eq!(
        behaviors.take_fired(),
        dispatch.fired,
        "{label}: dispatch {} at {:?}",
        dispatch.event,
        dispatch.path
    );
}
