//! Integration tests for the render target system
//!
//! These tests drive the TargetManager singleton through Engine against the
//! mock graphics device and mock scene collaborators. No GPU required.
//!
//! Run with: cargo test --test target_integration_tests

use std::sync::{Arc, Mutex};
use galaxy_3d_offscreen::galaxy3d::camera::Camera;
use galaxy_3d_offscreen::galaxy3d::device::mock_graphics_device::{CommandLog, MockGraphicsDevice};
use galaxy_3d_offscreen::galaxy3d::scene::mock_collaborators::{
    MockPostProcess, MockPostProcessManager, MockRenderingDispatcher,
};
use galaxy_3d_offscreen::galaxy3d::scene::{Drawable, SharedScene, Scene, SubMesh};
use galaxy_3d_offscreen::galaxy3d::target::{SizeSpec, REFRESH_RATE_RENDER_ONCE};
use galaxy_3d_offscreen::galaxy3d::{Engine, RenderTarget, RenderTargetDesc};
use galaxy_3d_offscreen::glam::{Mat4, Vec3};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

struct World {
    log: CommandLog,
    device: Arc<Mutex<MockGraphicsDevice>>,
    scene: SharedScene,
}

fn world() -> World {
    let log = CommandLog::new();
    let device = MockGraphicsDevice::new(log.clone()).into_shared();
    let scene = Scene::new(
        device.clone(),
        Box::new(MockRenderingDispatcher::new(log.clone())),
        Box::new(MockPostProcessManager::new(log.clone())),
    )
    .into_shared();
    {
        let mut scene = scene.lock().unwrap();
        let camera = scene.add_camera(Camera::new(
            "main",
            Mat4::look_at_rh(Vec3::new(0.0, 2.0, 8.0), Vec3::ZERO, Vec3::Y),
            Mat4::perspective_rh(1.0, 4.0 / 3.0, 0.1, 100.0),
        ));
        scene.set_active_camera(Some(camera));
        let floor = scene.add_entity(Drawable::new("floor", vec![SubMesh::new(6)]));
        let statue = scene.add_entity(Drawable::new("statue", vec![SubMesh::new(900), SubMesh::new(120)]));
        scene.set_active_entities(vec![floor, statue]);
    }
    World { log, device, scene }
}

fn desc(name: &str, size: SizeSpec, is_cube: bool) -> RenderTargetDesc {
    RenderTargetDesc {
        name: name.to_string(),
        size,
        is_cube,
        ..RenderTargetDesc::default()
    }
}

// ============================================================================
// TARGET MANAGER LIFECYCLE TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_target_manager_lifecycle() {
    let world = world();
    Engine::initialize().unwrap();
    Engine::create_target_manager().unwrap();

    let tm_arc = Engine::target_manager().unwrap();
    {
        let mut tm = tm_arc.lock().unwrap();
        let mirror = tm.create_render_target(&world.scene, desc("mirror", SizeSpec::Ratio(0.5), false)).unwrap();
        let probe = tm.create_render_target(&world.scene, desc("probe", SizeSpec::Square(128), true)).unwrap();
        tm.attach_to_scene(mirror).unwrap();
        tm.attach_to_scene(probe).unwrap();
        assert_eq!(tm.render_target_count(), 2);

        world.log.clear();
        assert_eq!(tm.render_scene_targets(&world.scene).unwrap(), 2);
        assert_eq!(world.log.count("bind #1"), 1);
        assert_eq!(world.log.count("bind #2 face="), 6);
        assert_eq!(world.log.count("generate_cube_mipmaps #2"), 1);
    }

    // Destroying the manager gives every surface back to the device
    Engine::destroy_target_manager().unwrap();
    assert_eq!(world.device.lock().unwrap().live_surface_count(), 0);
    assert!(world.scene.lock().unwrap().custom_render_targets().is_empty());
    assert!(Engine::target_manager().is_err());

    Engine::shutdown();
}

#[test]
#[serial]
fn test_integration_create_target_manager_twice_fails() {
    Engine::initialize().unwrap();
    Engine::create_target_manager().unwrap();

    assert!(Engine::create_target_manager().is_err());

    Engine::destroy_target_manager().unwrap();
    Engine::shutdown();
}

// ============================================================================
// FRAME FLOW TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_viewport_resize_reallocates_ratio_targets() {
    let world = world();
    let mut tm = galaxy_3d_offscreen::galaxy3d::TargetManager::new();
    let key = tm.create_render_target(&world.scene, desc("mirror", SizeSpec::Ratio(1.0), false)).unwrap();
    tm.attach_to_scene(key).unwrap();
    let before = tm.render_target(key).unwrap().render_size();

    world.device.lock().unwrap().resize_viewport(640, 480);
    tm.render_scene_targets(&world.scene).unwrap();

    let after = tm.render_target(key).unwrap().render_size();
    assert_ne!(before, after);
    let device = world.device.lock().unwrap();
    assert_eq!(device.live_surface_count(), 1);
    assert_eq!(device.stale_accesses(), 0);
    drop(device);

    tm.clear();
}

#[test]
#[serial]
fn test_integration_render_once_after_device_loss() {
    let world = world();
    let mut tm = galaxy_3d_offscreen::galaxy3d::TargetManager::new();
    let key = tm.create_render_target(&world.scene, desc("baked", SizeSpec::Square(64), false)).unwrap();
    tm.render_target_mut(key).unwrap().set_refresh_rate(REFRESH_RATE_RENDER_ONCE);
    tm.attach_to_scene(key).unwrap();

    assert_eq!(tm.render_scene_targets(&world.scene).unwrap(), 1);
    assert_eq!(tm.render_scene_targets(&world.scene).unwrap(), 0);

    tm.rebuild_all();
    world.log.clear();
    assert_eq!(tm.render_scene_targets(&world.scene).unwrap(), 1);
    assert_eq!(world.log.entries_starting_with("release"), vec!["release #1".to_string()]);
    assert_eq!(world.log.count("bind #2"), 1);

    tm.clear();
}

#[test]
#[serial]
fn test_integration_post_process_chain_owned_by_target() {
    let world = world();
    let mut tm = galaxy_3d_offscreen::galaxy3d::TargetManager::new();
    let key = tm.create_render_target(&world.scene, desc("blurred", SizeSpec::Square(64), false)).unwrap();
    let blur = MockPostProcess::new("blur", world.log.clone());
    tm.render_target_mut(key).unwrap().add_post_process_stage(blur.clone(), None).unwrap();
    tm.attach_to_scene(key).unwrap();
    world.log.clear();

    tm.render_scene_targets(&world.scene).unwrap();

    assert_eq!(world.log.count("post.prepare target #1 [blur]"), 1);
    assert_eq!(world.log.count("post.finalize target #1 face=0 [blur]"), 1);
    assert_eq!(world.log.count("bind #1"), 0);

    tm.remove_render_target(key);
    assert!(blur.is_disposed());
}

// ============================================================================
// SAVE / LOAD TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_json_round_trip_through_manager() {
    let world = world();
    let mut tm = galaxy_3d_offscreen::galaxy3d::TargetManager::new();
    let key = tm.create_render_target(&world.scene, desc("mirror", SizeSpec::Square(256), false)).unwrap();
    let statue = world.scene.lock().unwrap().entity_by_id("statue").unwrap();
    tm.render_target_mut(key).unwrap().set_render_list(Some(vec![statue]));

    let json = tm.render_target(key).unwrap().to_json().unwrap().unwrap();
    tm.remove_render_target(key);

    let loaded = RenderTarget::from_json(&world.scene, &json).unwrap();
    let key = tm.insert_render_target(loaded).unwrap();
    tm.attach_to_scene(key).unwrap();
    world.log.clear();
    tm.render_scene_targets(&world.scene).unwrap();

    let target = tm.render_target(key).unwrap();
    assert_eq!(target.render_list(), Some(&[statue][..]));
    assert_eq!(world.log.entries_starting_with("dispatcher.dispatch").len(), 2);

    tm.clear();
}
