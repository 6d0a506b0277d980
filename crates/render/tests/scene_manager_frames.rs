use glam::Vec3;
use render::layout::{self, SHAPE_RECORD_SIZE};
use render::{
    BoundValue, FrameCamera, FrameStatus, FrameUniforms, HostBackend, HostShapeBinding,
    RenderError, SceneManager, SyncOutcome,
};
use scene::{EntityId, NodeGraph, Operation, Shape, ShapeSet, ShapeType};

fn uniforms() -> FrameUniforms {
    let camera = FrameCamera::looking_at(Vec3::new(0.0, 1.0, 8.0), Vec3::ZERO, 1280, 720);
    FrameUniforms::new(&camera, None)
}

/// A cube with one sphere child plus a free-standing torus.
fn build_scene() -> (NodeGraph, ShapeSet, [EntityId; 3]) {
    let mut graph = NodeGraph::new();
    let cube = graph.spawn("cube");
    let sphere = graph.spawn_child(cube, "sphere").unwrap();
    let torus = graph.spawn("torus");
    graph.set_translation(sphere, Vec3::new(0.0, 1.0, 0.0)).unwrap();
    graph.set_translation(torus, Vec3::new(3.0, 0.0, 0.0)).unwrap();

    let mut shapes = ShapeSet::new();
    shapes.insert(cube, Shape::new(ShapeType::Cube, Operation::Union));
    shapes.insert(sphere, Shape::new(ShapeType::Sphere, Operation::Blend));
    shapes.insert(torus, Shape::new(ShapeType::Torus, Operation::Cut));
    (graph, shapes, [cube, sphere, torus])
}

#[test]
fn first_frame_packs_and_binds() {
    let (graph, mut shapes, [cube, ..]) = build_scene();
    let mut manager = SceneManager::new(HostBackend::new());
    let mut binding = HostShapeBinding::new();

    let report = manager
        .frame(&mut shapes, &graph, &mut binding, &uniforms())
        .unwrap();
    println!("🔵 First frame: {report:?}");

    assert_eq!(report.frame, 1);
    assert_eq!(report.status, FrameStatus::Synced(SyncOutcome::Repacked { count: 3 }));
    assert_eq!(binding.num_shapes(), Some(3));
    assert_eq!(
        binding.bound_buffer(),
        manager.packer().buffer().map(|b| b.id())
    );
    assert_eq!(shapes.get(cube).unwrap().num_children, 1, "Counts written back");
    assert_eq!(
        binding.get(layout::CAMERA_POSITION),
        Some(BoundValue::Vector([0.0, 1.0, 8.0, 1.0]))
    );
    assert!(binding.get(layout::CAMERA_TO_WORLD).is_some());
    assert!(binding.get(layout::LIGHT_DIRECTION).is_some());
}

#[test]
fn unready_binding_skips_and_keeps_pending_change() {
    let (graph, mut shapes, _) = build_scene();
    let mut manager = SceneManager::new(HostBackend::new());
    let mut binding = HostShapeBinding::unassigned();

    let report = manager
        .frame(&mut shapes, &graph, &mut binding, &uniforms())
        .unwrap();
    assert_eq!(report.status, FrameStatus::Skipped);
    assert_eq!(manager.packer().backend().stats().allocations, 0);
    assert_eq!(manager.packer().backend().stats().flushes, 0, "Skipped frames submit nothing");
    assert_eq!(binding.num_shapes(), None, "Nothing bound while not ready");

    binding.set_ready(true);
    let report = manager
        .frame(&mut shapes, &graph, &mut binding, &uniforms())
        .unwrap();
    assert_eq!(report.frame, 2);
    assert_eq!(report.status, FrameStatus::Synced(SyncOutcome::Repacked { count: 3 }));
}

#[test]
fn steady_frames_upload_only_moves() {
    let (mut graph, mut shapes, [_, _, torus]) = build_scene();
    let mut manager = SceneManager::new(HostBackend::new());
    let mut binding = HostShapeBinding::new();
    let u = uniforms();

    manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    let report = manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    assert_eq!(report.status, FrameStatus::Synced(SyncOutcome::Unchanged));

    graph.set_translation(torus, Vec3::new(3.0, 0.5, 0.0)).unwrap();
    let report = manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    assert_eq!(report.status, FrameStatus::Synced(SyncOutcome::Updated { records: 1 }));

    let backend = manager.packer().backend();
    assert_eq!(backend.stats().allocations, 1, "No reallocation for moves");
    assert_eq!(backend.writes().len(), 1);
    assert_eq!(backend.writes()[0].len, 24);
    // Torus is the only Cut shape, so it is the last record.
    assert_eq!(backend.writes()[0].offset, (2 * SHAPE_RECORD_SIZE) as u64);
    assert_eq!(binding.shape_binds(), 1, "Buffer bound once");
    assert_eq!(backend.stats().flushes, 3, "One submit per frame");
}

#[test]
fn adding_and_removing_shapes_repacks() {
    let (mut graph, mut shapes, [cube, sphere, _]) = build_scene();
    let mut manager = SceneManager::new(HostBackend::new());
    let mut binding = HostShapeBinding::new();
    let u = uniforms();

    manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    let first = binding.bound_buffer();

    let prism = graph.spawn("prism");
    manager.add_shape(&mut shapes, prism, Shape::new(ShapeType::Prism, Operation::Mask));
    let report = manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    assert_eq!(report.status, FrameStatus::Synced(SyncOutcome::Repacked { count: 4 }));
    assert_ne!(binding.bound_buffer(), first, "New buffer must be rebound");

    assert!(manager.remove_shape(&mut shapes, sphere).is_some());
    assert!(manager.remove_shape(&mut shapes, sphere).is_none());
    let report = manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    assert_eq!(report.shape_count, 3);
    assert_eq!(shapes.get(cube).unwrap().num_children, 0);

    let stats = manager.packer().backend().stats();
    assert_eq!(stats.allocations, 3);
    assert_eq!(stats.releases, 2);
}

#[test]
fn empty_scene_binds_zero_count() {
    let graph = NodeGraph::new();
    let mut shapes = ShapeSet::new();
    let mut manager = SceneManager::new(HostBackend::new());
    let mut binding = HostShapeBinding::new();

    let report = manager
        .frame(&mut shapes, &graph, &mut binding, &uniforms())
        .unwrap();
    assert_eq!(report.shape_count, 0);
    assert_eq!(binding.num_shapes(), Some(0));
    assert_eq!(binding.bound_buffer(), None);
}

#[test]
fn removing_last_shape_unbinds_stale_buffer() {
    let (graph, mut shapes, ids) = build_scene();
    let mut manager = SceneManager::new(HostBackend::new());
    let mut binding = HostShapeBinding::new();
    let u = uniforms();

    manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    assert!(binding.bound_buffer().is_some());

    for id in ids {
        manager.remove_shape(&mut shapes, id);
    }
    manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    assert_eq!(binding.bound_buffer(), None);
    assert_eq!(binding.num_shapes(), Some(0));
    assert_eq!(manager.packer().backend().live_buffers(), 0);
}

#[test]
fn allocation_failure_binds_nothing_and_retries() {
    let (graph, mut shapes, [_, _, torus]) = build_scene();
    let limit = 2 * SHAPE_RECORD_SIZE as u64;
    let mut manager = SceneManager::new(HostBackend::new().with_limit(limit));
    let mut binding = HostShapeBinding::new();
    let u = uniforms();

    let err = manager
        .frame(&mut shapes, &graph, &mut binding, &u)
        .unwrap_err();
    assert!(matches!(err, RenderError::BufferTooLarge { .. }));
    assert_eq!(binding.num_shapes(), Some(0));
    assert_eq!(binding.bound_buffer(), None);

    manager.remove_shape(&mut shapes, torus);
    let report = manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    assert_eq!(report.status, FrameStatus::Synced(SyncOutcome::Repacked { count: 2 }));
}

#[test]
fn shutdown_releases_every_buffer() {
    let (graph, mut shapes, _) = build_scene();
    let mut manager = SceneManager::new(HostBackend::new());
    let mut binding = HostShapeBinding::new();
    let u = uniforms();

    manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    manager.notify_scene_changed();
    manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();

    manager.shutdown(&mut binding);
    manager.shutdown(&mut binding);
    let stats = manager.packer().backend().stats();
    assert_eq!(stats.allocations, 2);
    assert_eq!(stats.releases, 2, "Each buffer released exactly once");
    assert_eq!(manager.packer().backend().live_buffers(), 0);
    assert_eq!(binding.bound_buffer(), None, "Binding must not keep a released buffer");
    assert_eq!(binding.num_shapes(), Some(0));

    // The next frame starts over.
    let report = manager.frame(&mut shapes, &graph, &mut binding, &u).unwrap();
    assert_eq!(report.status, FrameStatus::Synced(SyncOutcome::Repacked { count: 3 }));
    assert_eq!(binding.bound_buffer(), manager.packer().buffer().map(|b| b.id()));
    assert_eq!(binding.num_shapes(), Some(3));
}

#[test]
fn binding_ready_after_skip_gets_current_buffer() {
    let (graph, mut shapes, _) = build_scene();
    let mut manager = SceneManager::new(HostBackend::new());
    let mut first = HostShapeBinding::new();
    let u = uniforms();

    manager.frame(&mut shapes, &graph, &mut first, &u).unwrap();
    let buffer_id = manager.packer().buffer().map(|b| b.id());

    // A recreated binding starts out unready and empty.
    let mut second = HostShapeBinding::unassigned();
    let report = manager.frame(&mut shapes, &graph, &mut second, &u).unwrap();
    assert_eq!(report.status, FrameStatus::Skipped);

    second.set_ready(true);
    let report = manager.frame(&mut shapes, &graph, &mut second, &u).unwrap();
    assert_eq!(report.status, FrameStatus::Synced(SyncOutcome::Unchanged));
    assert_eq!(second.bound_buffer(), buffer_id, "Unchanged buffer still bound after skip");
    assert_eq!(second.num_shapes(), Some(3));
    assert_eq!(manager.packer().backend().stats().allocations, 1);

    // Only the frame after the skip rebinds.
    manager.frame(&mut shapes, &graph, &mut second, &u).unwrap();
    assert_eq!(second.shape_binds(), 1);
}

#[test]
fn swapped_binding_is_rebound_on_request() {
    let (graph, mut shapes, _) = build_scene();
    let mut manager = SceneManager::new(HostBackend::new());
    let mut first = HostShapeBinding::new();
    let u = uniforms();

    manager.frame(&mut shapes, &graph, &mut first, &u).unwrap();

    let mut second = HostShapeBinding::new();
    manager.notify_binding_changed();
    let report = manager.frame(&mut shapes, &graph, &mut second, &u).unwrap();
    assert_eq!(report.status, FrameStatus::Synced(SyncOutcome::Unchanged));
    assert_eq!(second.bound_buffer(), first.bound_buffer());
    assert_eq!(second.num_shapes(), Some(3));
}
