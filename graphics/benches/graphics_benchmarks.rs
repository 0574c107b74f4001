use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use gitech_graphics::backend::{DummyBackend, DummyResourceManager, Extent2d, PixelFormat};
use gitech_graphics::resource::{RenderTargetResource, ShaderResource, TextureResource};
use gitech_graphics::{
    ConcurrentLoader, FrameContext, LoadStrategy, LoaderConfig, PassGraph, PassNode,
    ResourceRegistry, TargetSize,
};

// ---------------------------------------------------------------------------
// Resource loading
// ---------------------------------------------------------------------------

fn registry(count: usize) -> Arc<ResourceRegistry> {
    let mut builder = ResourceRegistry::builder();
    for i in 0..count {
        match i % 3 {
            0 => {
                builder.register(
                    format!("shader {i}"),
                    ShaderResource::new(format!("{i}.vs"), format!("{i}.ps")),
                );
            }
            1 => {
                builder.register(
                    format!("texture {i}"),
                    TextureResource::new(
                        format!("{i}.dds"),
                        Extent2d::new(256, 256),
                        PixelFormat::Rgba8Unorm,
                    ),
                );
            }
            _ => {
                builder.register(
                    format!("target {i}"),
                    RenderTargetResource::color(
                        format!("target {i}"),
                        TargetSize::relative(0.5, 0.5),
                        PixelFormat::Rgba16Float,
                    ),
                );
            }
        }
    }
    Arc::new(builder.build())
}

fn bench_loader(c: &mut Criterion, strategy: LoadStrategy, workers: usize) {
    let name = format!("load_256_resources_{strategy:?}_{workers}_threads").to_lowercase();
    c.bench_function(&name, |b| {
        b.iter(|| {
            let rm = Arc::new(DummyResourceManager::default());
            let loader = Arc::new(ConcurrentLoader::new(
                registry(256),
                rm,
                LoaderConfig::default().with_strategy(strategy),
            ));
            black_box(loader.run(workers).ok());
        });
    });
}

fn bench_loader_queue_1(c: &mut Criterion) {
    bench_loader(c, LoadStrategy::Queue, 1);
}

fn bench_loader_queue_4(c: &mut Criterion) {
    bench_loader(c, LoadStrategy::Queue, 4);
}

fn bench_loader_poll_4(c: &mut Criterion) {
    bench_loader(c, LoadStrategy::Poll, 4);
}

// ---------------------------------------------------------------------------
// Pass tree traversal
// ---------------------------------------------------------------------------

fn wide_tree(groups: usize, leaves: usize) -> PassNode {
    let mut root = PassNode::group("Frame");
    for g in 0..groups {
        let mut group = PassNode::group(format!("group {g}"));
        for l in 0..leaves {
            group.add_child(PassNode::group(format!("leaf {g}.{l}")));
        }
        root.add_child(group);
    }
    root
}

fn bench_draw_tree(c: &mut Criterion) {
    let rm = Arc::new(DummyResourceManager::default());
    let mut graph = PassGraph::new(wide_tree(4, 8));
    graph
        .allocate_resources(rm.as_ref())
        .expect("group passes allocate nothing");
    let mut backend = DummyBackend::with_resource_manager(rm);
    let mut frame = 0;

    c.bench_function("draw_pass_tree_37_nodes", |b| {
        b.iter(|| {
            let report = graph.draw(FrameContext::new(&mut backend, 0.016, frame));
            frame += 1;
            black_box(report);
        });
    });
}

criterion_group!(
    loader_benches,
    bench_loader_queue_1,
    bench_loader_queue_4,
    bench_loader_poll_4
);
criterion_group!(pass_benches, bench_draw_tree);
criterion_main!(loader_benches, pass_benches);
