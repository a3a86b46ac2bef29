/// Shared setup for render target unit tests: a mock device, a scene wired
/// to mock collaborators, and the command log they all record into.

use std::sync::{Arc, Mutex};
use glam::{Mat4, Vec3};
use crate::camera::{Camera, CameraKey};
use crate::graphics_device::mock_graphics_device::{CommandLog, MockGraphicsDevice};
use crate::scene::mock_collaborators::{
    DispatchRecord, MockPostProcessManager, MockRenderingDispatcher,
};
use crate::scene::{Drawable, EntityKey, SharedScene, SubMesh, Scene};
use super::{RenderTarget, RenderTargetDesc, SizeSpec};

pub(crate) struct Fixture {
    pub log: CommandLog,
    pub device: Arc<Mutex<MockGraphicsDevice>>,
    pub scene: SharedScene,
    pub dispatch: Arc<Mutex<DispatchRecord>>,
    pub camera_stages: Arc<std::sync::atomic::AtomicBool>,
}

impl Fixture {
    pub fn new() -> Self {
        let log = CommandLog::new();
        let device = MockGraphicsDevice::new(log.clone()).into_shared();
        let dispatcher = MockRenderingDispatcher::new(log.clone());
        let dispatch = dispatcher.record();
        let post = MockPostProcessManager::new(log.clone());
        let camera_stages = post.camera_stages_flag();
        let scene = Scene::new(device.clone(), Box::new(dispatcher), Box::new(post)).into_shared();
        Self { log, device, scene, dispatch, camera_stages }
    }

    pub fn flat(&self, name: &str, size: u32) -> RenderTarget {
        self.target(name, SizeSpec::Square(size), false)
    }

    pub fn cube(&self, name: &str, size: u32) -> RenderTarget {
        self.target(name, SizeSpec::Square(size), true)
    }

    pub fn target(&self, name: &str, size: SizeSpec, is_cube: bool) -> RenderTarget {
        let desc = RenderTargetDesc {
            name: name.to_string(),
            size,
            is_cube,
            ..RenderTargetDesc::default()
        };
        RenderTarget::new(&self.scene, desc).unwrap()
    }

    pub fn add_entity(&self, id: &str) -> EntityKey {
        self.scene.lock().unwrap().add_entity(Drawable::new(id, vec![SubMesh::new(6)]))
    }

    pub fn add_active_camera(&self) -> CameraKey {
        let mut scene = self.scene.lock().unwrap();
        let key = scene.add_camera(Camera::new(
            "main",
            Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y),
            Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0),
        ));
        scene.set_active_camera(Some(key));
        key
    }

    /// Commands recorded since the last `log.clear()`, filtered to those starting with any prefix
    pub fn commands(&self, prefixes: &[&str]) -> Vec<String> {
        self.log
            .entries()
            .into_iter()
            .filter(|c| prefixes.iter().any(|p| c.starts_with(p)))
            .collect()
    }
}
