use criterion::{criterion_group, criterion_main, Criterion};
use glam::Vec3;
use render::{HostBackend, ShapeBufferPacker};
use scene::{collect, EntityId, NodeGraph, Operation, Shape, ShapeSet, ShapeType};

/// 64 parent cubes, each blending three sphere children.
fn build_scene() -> (NodeGraph, ShapeSet, Vec<EntityId>) {
    let mut graph = NodeGraph::new();
    let mut shapes = ShapeSet::new();
    let mut parents = Vec::new();
    for i in 0..64u32 {
        let parent = graph.spawn(&format!("cube{i}"));
        graph
            .set_translation(parent, Vec3::new((i % 8) as f32 * 2.0, 0.0, (i / 8) as f32 * 2.0))
            .unwrap();
        shapes.insert(parent, Shape::new(ShapeType::Cube, Operation::Union));
        for j in 0..3u32 {
            let child = graph.spawn_child(parent, &format!("sphere{i}_{j}")).unwrap();
            graph.set_translation(child, Vec3::new(0.0, j as f32 * 0.5, 0.0)).unwrap();
            shapes.insert(child, Shape::new(ShapeType::Sphere, Operation::Blend));
        }
        parents.push(parent);
    }
    (graph, shapes, parents)
}

fn bench_collect_and_pack(c: &mut Criterion) {
    let (graph, mut shapes, _) = build_scene();
    c.bench_function("collect_and_pack_256", |b| {
        let mut packer = ShapeBufferPacker::new(HostBackend::new());
        b.iter(|| {
            let resolved = collect(&mut shapes, &graph);
            packer.pack(&resolved).unwrap();
        })
    });
}

fn bench_in_place_update(c: &mut Criterion) {
    let (mut graph, mut shapes, parents) = build_scene();
    let mut packer = ShapeBufferPacker::new(HostBackend::new());
    packer.pack(&collect(&mut shapes, &graph)).unwrap();

    let mut t = 0.0f32;
    c.bench_function("update_positions_256", |b| {
        b.iter(|| {
            t += 0.01;
            for &parent in &parents {
                graph.set_scale(parent, Vec3::splat(1.0 + t.sin() * 0.1)).unwrap();
            }
            let resolved = collect(&mut shapes, &graph);
            packer.update_positions(&resolved).unwrap();
            packer.backend_mut().clear_writes();
        })
    });
}

criterion_group!(benches, bench_collect_and_pack, bench_in_place_update);
criterion_main!(benches);
