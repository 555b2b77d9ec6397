use bus::{Bus, RenderCommand, RenderEvent};
use mimalloc::MiMalloc;
use runtime_render::{RuntimeConfig, start_render_runtime};
use std::time::Duration;
use vdom::{Behavior, Descriptor, element};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const ROOT: u64 = 1;

fn form(with_href: bool, on_change: &Behavior) -> Descriptor {
    let mut link = element("a");
    if with_href {
        link = link.attr("href", "https://example.com");
    }
    let link = link
        .class("logo")
        .style("marginRight", "1rem")
        .style("color", "red")
        .attr("data-testid", "1");
    element("div")
        .attr("id", "foo")
        .child(link.text("bar"))
        .child(
            element("input")
                .attr("value", "test")
                .behavior("onChange", on_change.clone()),
        )
        .build()
}

fn main() {
    let (bus, cmd_rx) = Bus::new();
    let runtime = start_render_runtime(cmd_rx, bus.evt_tx.clone(), RuntimeConfig::default());

    let on_change = Behavior::new(|event| {
        println!("change on {}: {:?}", event.target, event.value);
    });
    let frames = [form(true, &on_change), form(false, &on_change)];

    for descriptor in frames {
        if bus
            .cmd_tx
            .send(RenderCommand::Render {
                root: ROOT,
                descriptor,
            })
            .is_err()
        {
            eprintln!("render runtime exited early");
            return;
        }
        match bus.evt_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(RenderEvent::Committed {
                summary, outline, ..
            }) => {
                println!(
                    "{}: {} placement(s), {} update(s), {} deletion(s), {} mutation(s)",
                    summary.generation,
                    summary.placements,
                    summary.updates,
                    summary.deletions,
                    summary.mutations
                );
                for line in outline {
                    println!("  {line}");
                }
            }
            Ok(RenderEvent::Failed { error, .. }) => eprintln!("render failed: {error}"),
            Ok(other) => eprintln!("unexpected event {other:?}"),
            Err(err) => {
                eprintln!("no commit: {err}");
                return;
            }
        }
    }

    let _ = bus.cmd_tx.send(RenderCommand::Dispatch {
        root: ROOT,
        path: vec![0, 1],
        event: "change".to_string(),
        value: Some("typed".to_string()),
    });
    if let Ok(RenderEvent::Dispatched { listeners, .. }) =
        bus.evt_rx.recv_timeout(Duration::from_secs(5))
    {
        println!("dispatched to {listeners} listener(s)");
    }

    let _ = bus.cmd_tx.send(RenderCommand::Shutdown);
    let _ = runtime.join();
}
