use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use reconciler::{Reconciler, UnitBudget, WorkStatus};
use surface::SurfaceStore;
use vdom::{Descriptor, element};

const SMALL_ROWS: usize = 64;
const LARGE_ROWS: usize = 5_000;

fn make_table(rows: usize, revision: usize) -> Descriptor {
    element("table")
        .children((0..rows).map(|row| {
            element("tr")
                .attr("data-row", row as i32)
                .child(element("td").text(format!("r{row}")))
                .child(
                    element("td")
                        .class(if (row + revision) % 7 == 0 { "hot" } else { "cold" })
                        .text(format!("v{}", row * revision)),
                )
        }))
        .build()
}

fn mounted(tree: &Descriptor) -> Reconciler<SurfaceStore> {
    let mut store = SurfaceStore::new();
    let container = store.create_container();
    let mut reconciler = Reconciler::new(store);
    reconciler.schedule_render(tree.clone(), container);
    if let Err(err) = reconciler.run_to_completion() {
        panic!("mount failed: {err}");
    }
    reconciler
}

fn bench_mount_small(c: &mut Criterion) {
    let tree = make_table(SMALL_ROWS, 0);
    c.bench_function("bench_mount_small", |b| {
        b.iter(|| black_box(mounted(black_box(&tree)).generation()));
    });
}

fn bench_mount_large(c: &mut Criterion) {
    let tree = make_table(LARGE_ROWS, 0);
    c.bench_function("bench_mount_large", |b| {
        b.iter(|| black_box(mounted(black_box(&tree)).generation()));
    });
}

fn bench_patch_large(c: &mut Criterion) {
    let base = make_table(LARGE_ROWS, 0);
    let next = make_table(LARGE_ROWS, 1);
    c.bench_function("bench_patch_large", |b| {
        b.iter_batched(
            || mounted(&base),
            |mut reconciler| {
                // container is always the first handle a fresh store hands out
                reconciler.schedule_render(next.clone(), core_types::SurfaceHandle(1));
                black_box(reconciler.run_to_completion().ok());
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_sliced_patch_large(c: &mut Criterion) {
    let base = make_table(LARGE_ROWS, 0);
    let next = make_table(LARGE_ROWS, 1);
    c.bench_function("bench_sliced_patch_large", |b| {
        b.iter_batched(
            || mounted(&base),
            |mut reconciler| {
                reconciler.schedule_render(next.clone(), core_types::SurfaceHandle(1));
                let mut slices = 0usize;
                while let Ok(WorkStatus::Suspended { .. }) =
                    reconciler.resume(&mut UnitBudget::new(64))
                {
                    slices += 1;
                }
                black_box(slices);
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_mount_small,
    bench_mount_large,
    bench_patch_large,
    bench_sliced_patch_large
);
criterion_main!(benches);
