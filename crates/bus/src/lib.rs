use core_types::RootId;
use reconciler::CommitSummary;
use std::sync::mpsc::{self, Receiver, Sender};
use vdom::Descriptor;

#[derive(Debug)]
pub enum RenderCommand {
    /// Schedule a pass rendering `descriptor` into `root`'s container. A pass
    /// still in flight for the same root is abandoned.
    Render {
        root: RootId,
        descriptor: Descriptor,
    },
    /// Deliver `event` to the node reached by following child indices from
    /// the root container.
    Dispatch {
        root: RootId,
        path: Vec<usize>,
        event: String,
        value: Option<String>,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum RenderEvent {
    Committed {
        root: RootId,
        summary: CommitSummary,
        outline: Vec<String>,
    },
    Failed {
        root: RootId,
        error: String,
    },
    Dispatched {
        root: RootId,
        event: String,
        listeners: usize,
    },
}

pub struct Bus {
    pub cmd_tx: Sender<RenderCommand>,
    pub evt_rx: Receiver<RenderEvent>,
    pub evt_tx: Sender<RenderEvent>, // shareable for runtimes
}

impl Bus {
    /// Returns the bus and the command receiver to hand to a runtime.
    pub fn new() -> (Self, Receiver<RenderCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();
        (
            Self {
                cmd_tx,
                evt_rx,
                evt_tx,
            },
            cmd_rx,
        )
    }
}
