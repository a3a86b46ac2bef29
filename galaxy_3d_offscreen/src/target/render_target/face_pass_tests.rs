/// Tests for the render path: sequencing of a face pass, render list
/// dispatch, particles, post-processing, cameras and debug dumps.

use std::sync::{Arc, Mutex};
use glam::{Mat4, Vec3};
use crate::camera::Camera;
use crate::graphics_device::{Color4, SharedGraphicsDevice};
use crate::scene::mock_collaborators::MockPostProcess;
use crate::scene::{ParticleSystem, PostProcess};
use crate::target::test_fixture::Fixture;
use crate::target::RenderTarget;

fn record_events(target: &mut RenderTarget, fixture: &Fixture) {
    let log = fixture.log.clone();
    target.on_before_bind().add(move |name| log.push(format!("event.before_bind {}", name)));
    let log = fixture.log.clone();
    target.on_before_render().add(move |face| log.push(format!("event.before_render {}", face)));
    let log = fixture.log.clone();
    target.on_after_render().add(move |face| log.push(format!("event.after_render {}", face)));
    let log = fixture.log.clone();
    target.on_after_unbind().add(move |name| log.push(format!("event.after_unbind {}", name)));
}

// ============================================================================
// Flat target sequencing
// ============================================================================

#[test]
fn test_flat_render_sequence() {
    let fixture = Fixture::new();
    let entity = fixture.add_entity("box");
    fixture.scene.lock().unwrap().set_active_entities(vec![entity]);
    let mut target = fixture.flat("mirror", 256);
    fixture.log.clear();

    target.render(false, false).unwrap();

    let entries = fixture.log.entries();
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[0], "dispatcher.reset");
    assert_eq!(entries[1], "dispatcher.dispatch 0");
    assert_eq!(entries[2], "bind #1");
    assert!(entries[3].starts_with("clear"));
    assert_eq!(entries[4], "dispatcher.render list=1 particles=true sprites=false custom=false");
    assert_eq!(entries[5], "unbind #1");
}

#[test]
fn test_flat_events_order() {
    let fixture = Fixture::new();
    let mut target = fixture.flat("mirror", 64);
    record_events(&mut target, &fixture);
    fixture.log.clear();

    target.render(false, false).unwrap();

    let events = fixture.commands(&["event.", "bind", "unbind", "clear"]);
    assert_eq!(events[0], "event.before_bind mirror");
    assert_eq!(events[1], "bind #1");
    assert_eq!(events[2], "event.before_render 0");
    assert!(events[3].starts_with("clear"));
    assert_eq!(events[4], "unbind #1");
    assert_eq!(events[5], "event.after_render 0");
    assert_eq!(events[6], "event.after_unbind mirror");
    assert_eq!(events.len(), 7);
}

// ============================================================================
// Cube target sequencing
// ============================================================================

#[test]
fn test_cube_renders_six_faces_in_order() {
    let fixture = Fixture::new();
    let mut target = fixture.cube("probe", 128);
    record_events(&mut target, &fixture);
    fixture.log.clear();

    target.render(false, false).unwrap();

    let binds = fixture.commands(&["bind"]);
    let expected: Vec<String> = (0..6).map(|f| format!("bind #1 face={}", f)).collect();
    assert_eq!(binds, expected);
    assert_eq!(fixture.log.count("clear"), 6);
    assert_eq!(fixture.log.count("dispatcher.render"), 6);
    assert_eq!(fixture.log.count("generate_cube_mipmaps"), 1);
    assert_eq!(fixture.log.count("unbind"), 1);
    assert_eq!(fixture.log.count("event.after_unbind"), 1);
    assert_eq!(fixture.log.count("event.before_bind"), 1);
}

#[test]
fn test_cube_mipmaps_after_last_draw_before_unbind() {
    let fixture = Fixture::new();
    let mut target = fixture.cube("probe", 128);
    record_events(&mut target, &fixture);
    fixture.log.clear();

    target.render(false, false).unwrap();

    let entries = fixture.log.entries();
    let last_draw = entries.iter().rposition(|c| c.starts_with("dispatcher.render")).unwrap();
    let mipmaps = fixture.log.position("generate_cube_mipmaps #1").unwrap();
    let unbind = fixture.log.position("unbind #1").unwrap();
    assert!(last_draw < mipmaps);
    assert!(mipmaps < unbind);

    // Faces 0-4 complete without an unbind, face 5 completes from the unbind
    for face in 0..5 {
        let after = fixture.log.position(&format!("event.after_render {}", face)).unwrap();
        assert!(after < unbind);
    }
    let last = fixture.log.position("event.after_render 5").unwrap();
    assert!(last > unbind);
    assert_eq!(fixture.log.count("event.after_render"), 6);
}

#[test]
fn test_cube_bumps_render_id_per_face() {
    let fixture = Fixture::new();
    let mut target = fixture.cube("probe", 32);
    fixture.scene.lock().unwrap().set_cached_material(Some(9));

    target.render(false, false).unwrap();

    let scene = fixture.scene.lock().unwrap();
    assert_eq!(scene.render_id(), 6);
    assert_eq!(scene.cached_material(), None);
}

// ============================================================================
// Clear
// ============================================================================

#[test]
fn test_clear_uses_target_color_then_scene_color() {
    let fixture = Fixture::new();
    fixture.scene.lock().unwrap().set_clear_color(Color4::new(0.0, 1.0, 0.0, 1.0));
    let mut target = fixture.flat("mirror", 16);
    fixture.log.clear();

    target.render(false, false).unwrap();
    assert!(fixture.commands(&["clear"])[0].ends_with("(0, 1, 0, 1)"));

    target.set_clear_color(Some(Color4::new(1.0, 0.0, 0.0, 1.0)));
    fixture.log.clear();
    target.render(false, false).unwrap();
    assert!(fixture.commands(&["clear"])[0].ends_with("(1, 0, 0, 1)"));
}

#[test]
fn test_clear_observer_replaces_device_clear() {
    let fixture = Fixture::new();
    let mut target = fixture.flat("mirror", 16);
    let calls = Arc::new(Mutex::new(0));
    let calls_clone = calls.clone();
    target.set_on_clear(move |device: &SharedGraphicsDevice| {
        device.lock().unwrap().clear(None, crate::graphics_device::ClearFlags::DEPTH);
        *calls_clone.lock().unwrap() += 1;
    });
    fixture.log.clear();

    target.render(false, false).unwrap();

    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(fixture.commands(&["clear"]), vec!["clear ClearFlags(DEPTH)".to_string()]);
}

// ============================================================================
// Dispatch rules
// ============================================================================

#[test]
fn test_not_ready_entity_skipped_and_counter_reset() {
    let fixture = Fixture::new();
    let ready = fixture.add_entity("ready");
    let pending = fixture.add_entity("pending");
    fixture.scene.lock().unwrap().entity_mut(pending).unwrap().set_ready(false);
    let mut target = fixture.flat("mirror", 16);
    target.set_refresh_rate(crate::target::REFRESH_RATE_RENDER_ONCE);
    target.set_render_list(Some(vec![pending, ready]));

    assert!(target.should_render());
    target.render(false, false).unwrap();

    let dispatched = fixture.dispatch.lock().unwrap().dispatched.clone();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].owner, ready);
    // Not ready: retried next frame even for a render-once target
    assert!(target.should_render());
}

#[test]
fn test_hidden_disabled_and_empty_entities_not_dispatched() {
    let fixture = Fixture::new();
    let hidden = fixture.add_entity("hidden");
    let disabled = fixture.add_entity("disabled");
    let empty = {
        let mut scene = fixture.scene.lock().unwrap();
        scene.entity_mut(hidden).unwrap().set_visible(false);
        scene.entity_mut(disabled).unwrap().set_enabled(false);
        scene.add_entity(crate::scene::Drawable::new("empty", Vec::new()))
    };
    let mut target = fixture.flat("mirror", 16);
    target.set_render_list(Some(vec![hidden, disabled, empty]));

    target.render(false, false).unwrap();

    assert!(fixture.dispatch.lock().unwrap().dispatched.is_empty());
    let scene = fixture.scene.lock().unwrap();
    assert_eq!(scene.entity(hidden).unwrap().pre_activated_render_id(), Some(0));
    assert_eq!(scene.entity(hidden).unwrap().activated_render_id(), None);
}

#[test]
fn test_dispatch_activates_and_counts_indices() {
    let fixture = Fixture::new();
    let entity = {
        let mut scene = fixture.scene.lock().unwrap();
        scene.add_entity(crate::scene::Drawable::new(
            "two_parts",
            vec![crate::scene::SubMesh::new(30), crate::scene::SubMesh::new(12)],
        ))
    };
    let mut target = fixture.flat("mirror", 16);
    target.set_render_list(Some(vec![entity]));

    target.render(false, false).unwrap();

    let scene = fixture.scene.lock().unwrap();
    assert_eq!(scene.active_indices(), 42);
    assert_eq!(scene.entity(entity).unwrap().activation_count(), 1);
    let dispatched = fixture.dispatch.lock().unwrap().dispatched.clone();
    assert_eq!(dispatched.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn test_layer_mask_applies_to_active_set_only() {
    let fixture = Fixture::new();
    let camera = fixture.add_active_camera();
    let masked = fixture.add_entity("masked");
    {
        let mut scene = fixture.scene.lock().unwrap();
        scene.camera_mut(camera).unwrap().set_layer_mask(0x1);
        scene.entity_mut(masked).unwrap().set_layer_mask(0x2);
        scene.set_active_entities(vec![masked]);
    }
    let mut target = fixture.flat("mirror", 16);

    target.render(false, false).unwrap();
    assert!(fixture.dispatch.lock().unwrap().queued.is_empty());

    target.set_render_list(Some(vec![masked]));
    target.render(false, false).unwrap();
    assert_eq!(fixture.dispatch.lock().unwrap().queued.len(), 1);
}

#[test]
fn test_no_camera_no_masking() {
    let fixture = Fixture::new();
    let entity = fixture.add_entity("any");
    {
        let mut scene = fixture.scene.lock().unwrap();
        scene.entity_mut(entity).unwrap().set_layer_mask(0);
        scene.set_active_entities(vec![entity]);
    }
    let mut target = fixture.flat("mirror", 16);

    target.render(false, false).unwrap();
    assert_eq!(fixture.dispatch.lock().unwrap().queued.len(), 1);
}

#[test]
fn test_predicate_list_recomputed_each_render() {
    let fixture = Fixture::new();
    let a = fixture.add_entity("a");
    let mut target = fixture.flat("mirror", 16);
    target.set_render_list(Some(Vec::new()));
    target.set_render_list_predicate(Some(Arc::new(|d: &crate::scene::Drawable| d.is_visible())));

    target.render(false, false).unwrap();
    assert_eq!(target.render_list(), Some(&[a][..]));

    let b = fixture.add_entity("b");
    fixture.scene.lock().unwrap().entity_mut(a).unwrap().set_visible(false);
    target.render(false, false).unwrap();
    assert_eq!(target.render_list(), Some(&[b][..]));
}

// ============================================================================
// Particles
// ============================================================================

#[test]
fn test_particles_dispatched_for_started_systems_with_rendered_emitter() {
    let fixture = Fixture::new();
    let emitter = fixture.add_entity("emitter");
    let elsewhere = fixture.add_entity("elsewhere");
    {
        let mut scene = fixture.scene.lock().unwrap();
        let mut sparks = ParticleSystem::new("sparks", Some(emitter));
        sparks.start();
        scene.add_particle_system(sparks);
        scene.add_particle_system(ParticleSystem::new("idle", Some(emitter)));
        let mut smoke = ParticleSystem::new("smoke", Some(elsewhere));
        smoke.start();
        scene.add_particle_system(smoke);
        let mut point = ParticleSystem::new("point", None);
        point.start();
        scene.add_particle_system(point);
    }
    let mut target = fixture.flat("mirror", 16);
    target.set_render_list(Some(vec![emitter]));

    target.render(false, false).unwrap();

    assert_eq!(fixture.dispatch.lock().unwrap().particles, vec!["sparks".to_string()]);
}

#[test]
fn test_particles_skipped_when_emitter_disabled() {
    let fixture = Fixture::new();
    let emitter = fixture.add_entity("emitter");
    {
        let mut scene = fixture.scene.lock().unwrap();
        scene.entity_mut(emitter).unwrap().set_enabled(false);
        let mut sparks = ParticleSystem::new("sparks", Some(emitter));
        sparks.start();
        scene.add_particle_system(sparks);
    }
    let mut target = fixture.flat("mirror", 16);
    target.set_render_list(Some(vec![emitter]));

    target.render(false, false).unwrap();

    assert!(fixture.dispatch.lock().unwrap().particles.is_empty());
}

// ============================================================================
// Post-processing
// ============================================================================

#[test]
fn test_owned_chain_replaces_bind() {
    let fixture = Fixture::new();
    let mut target = fixture.flat("mirror", 16);
    target.add_post_process_stage(MockPostProcess::new("blur", fixture.log.clone()), None).unwrap();
    fixture.camera_stages.store(true, std::sync::atomic::Ordering::SeqCst);
    fixture.log.clear();

    target.render(true, false).unwrap();

    assert_eq!(fixture.log.count("bind"), 0);
    assert_eq!(fixture.log.count("post.prepare target #1 [blur]"), 1);
    assert_eq!(fixture.log.count("post.finalize target #1 face=0 [blur]"), 1);
    assert_eq!(fixture.log.count("post.prepare scene"), 0);
    assert_eq!(fixture.log.count("unbind #1"), 1);
}

#[test]
fn test_camera_post_process_used_when_prepared() {
    let fixture = Fixture::new();
    let mut target = fixture.flat("mirror", 16);
    fixture.camera_stages.store(true, std::sync::atomic::Ordering::SeqCst);
    fixture.log.clear();

    target.render(true, false).unwrap();

    assert_eq!(fixture.log.count("bind"), 0);
    assert_eq!(fixture.log.count("post.prepare scene #1 [camera] true"), 1);
    assert_eq!(fixture.log.count("post.finalize scene #1 face=0 [camera]"), 1);
}

#[test]
fn test_camera_post_process_falls_back_to_bind() {
    let fixture = Fixture::new();
    let mut target = fixture.flat("mirror", 16);
    fixture.log.clear();

    target.render(true, false).unwrap();

    assert_eq!(fixture.log.count("post.prepare scene #1 [camera] false"), 1);
    assert_eq!(fixture.log.count("bind #1"), 1);
}

#[test]
fn test_use_camera_post_processes_override() {
    let fixture = Fixture::new();
    let mut target = fixture.flat("mirror", 16);
    fixture.camera_stages.store(true, std::sync::atomic::Ordering::SeqCst);
    target.set_use_camera_post_processes(Some(false));
    fixture.log.clear();

    target.render(true, false).unwrap();

    assert_eq!(fixture.log.count("post."), 0);
    assert_eq!(fixture.log.count("bind #1"), 1);
}

// ============================================================================
// Cameras and transform
// ============================================================================

#[test]
fn test_scene_camera_viewport_set_and_restored() {
    let fixture = Fixture::new();
    fixture.add_active_camera();
    let mut target = fixture.flat("mirror", 64);
    fixture.log.clear();

    target.render(false, false).unwrap();

    let viewports = fixture.commands(&["set_viewport"]);
    assert_eq!(viewports, vec![
        "set_viewport (0, 0, 1, 1) 64x64".to_string(),
        "set_viewport (0, 0, 1, 1)".to_string(),
    ]);
    let first_viewport = fixture.log.position("set_viewport (0, 0, 1, 1) 64x64").unwrap();
    assert!(first_viewport < fixture.log.position("dispatcher.reset").unwrap());
}

#[test]
fn test_target_camera_transform_restored_after_render() {
    let fixture = Fixture::new();
    let scene_camera = fixture.add_active_camera();
    let mirror_view = Mat4::look_at_rh(Vec3::new(0.0, -5.0, 0.0), Vec3::ZERO, Vec3::Z);
    let mirror_camera = fixture.scene.lock().unwrap().add_camera(Camera::new(
        "mirror",
        mirror_view,
        Mat4::perspective_rh(1.0, 1.0, 0.1, 10.0),
    ));
    let mut target = fixture.flat("mirror", 64);
    target.set_active_camera(Some(mirror_camera));
    let seen_view = Arc::new(Mutex::new(None));
    let seen_clone = seen_view.clone();
    let scene_for_observer = fixture.scene.clone();
    target.set_on_before_render(move |_| {
        *seen_clone.lock().unwrap() = Some(*scene_for_observer.lock().unwrap().view_matrix());
    });

    target.render(false, false).unwrap();

    assert_eq!(*seen_view.lock().unwrap(), Some(mirror_view));
    let scene = fixture.scene.lock().unwrap();
    let expected = *scene.camera(scene_camera).unwrap().view_matrix();
    assert_eq!(*scene.view_matrix(), expected);
}

#[test]
fn test_aspect_ratio_fitted_unless_disabled() {
    let fixture = Fixture::new();
    let camera = fixture.add_active_camera();
    let mut target = fixture.target(
        "wide",
        crate::target::SizeSpec::Explicit { width: 256, height: 128 },
        false,
    );
    target.set_do_not_change_aspect_ratio(false);

    target.render(false, false).unwrap();

    let scene = fixture.scene.lock().unwrap();
    let camera = scene.camera(camera).unwrap();
    let fitted = camera.projection_with_aspect(2.0);
    assert_eq!(*scene.projection_matrix(), fitted);
}

// ============================================================================
// Debug dump
// ============================================================================

#[test]
fn test_debug_dump_flipped_vertically() {
    let fixture = Fixture::new();
    let mut target = fixture.flat("mirror", 4);

    target.render(false, true).unwrap();

    let dump = target.last_debug_dump().unwrap();
    assert_eq!((dump.width, dump.height), (4, 4));
    assert_eq!(dump.pixels.len(), 16);
    assert_eq!(dump.pixels[0], [3, 3, 3, 3]);
    assert_eq!(dump.pixels[15], [0, 0, 0, 0]);
}

#[test]
fn test_debug_dump_failure_does_not_abort_pass() {
    let fixture = Fixture::new();
    fixture.device.lock().unwrap().set_fail_read_pixels(true);
    let mut target = fixture.flat("mirror", 4);
    fixture.log.clear();

    target.render(false, true).unwrap();

    assert!(target.last_debug_dump().is_none());
    assert_eq!(fixture.log.count("unbind #1"), 1);
}

// ============================================================================
// No-op renders
// ============================================================================

#[test]
fn test_render_without_scene_is_noop() {
    let fixture = Fixture::new();
    let mut target = fixture.flat("mirror", 16);
    let Fixture { scene, log, .. } = fixture;
    drop(scene);
    log.clear();

    assert!(target.render(false, false).is_ok());
    assert!(log.entries().is_empty());
}

#[test]
fn test_custom_render_function_forwarded() {
    let fixture = Fixture::new();
    let entity = fixture.add_entity("box");
    let mut target = fixture.flat("mirror", 16);
    target.set_render_list(Some(vec![entity]));
    let drawn = Arc::new(Mutex::new(0));
    let drawn_clone = drawn.clone();
    target.set_custom_render_function(Some(Arc::new(move |queues: &crate::scene::RenderQueues<'_>| {
        *drawn_clone.lock().unwrap() += queues.opaque.len();
    })));

    target.render(false, false).unwrap();

    assert_eq!(*drawn.lock().unwrap(), 1);
    assert_eq!(fixture.log.count("dispatcher.render list=1 particles=true sprites=false custom=true"), 1);
}

#[test]
fn test_stage_trait_object_usable() {
    let fixture = Fixture::new();
    let mut target = fixture.flat("mirror", 16);
    let stage: Arc<dyn PostProcess> = MockPostProcess::new("blur", fixture.log.clone());
    target.add_post_process_stage(stage.clone(), None).unwrap();
    assert_eq!(target.post_process_stages().len(), 1);
    assert!(target.remove_post_process_stage(&stage));
    assert!(target.post_process_stages().is_empty());
}
