/// Mock GraphicsDevice for tests and headless tools (no GPU required)
///
/// Every call is recorded as a short text command into a `CommandLog` that
/// can be shared with the scene-side mocks, so tests can assert the exact
/// interleaving of device, dispatcher and post-process calls.

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use winit::dpi::PhysicalSize;
use crate::error::{Error, Result};
use crate::events::Observable;
use crate::graphics_device::{
    GraphicsDevice, Surface, SurfaceId, RenderTargetOptions, DepthStencilOptions,
    Color4, ClearFlags, Extent2D, Viewport,
};

// ============================================================================
// Command log
// ============================================================================

/// Shared, ordered list of recorded commands
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    commands: Arc<Mutex<Vec<String>>>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command
    pub fn push(&self, command: impl Into<String>) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(command.into());
        }
    }

    /// Snapshot of every recorded command
    pub fn entries(&self) -> Vec<String> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Commands starting with `prefix`
    pub fn entries_starting_with(&self, prefix: &str) -> Vec<String> {
        self.entries().into_iter().filter(|c| c.starts_with(prefix)).collect()
    }

    /// Number of commands starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.entries_starting_with(prefix).len()
    }

    /// Index of the first command equal to `command`
    pub fn position(&self, command: &str) -> Option<usize> {
        self.entries().iter().position(|c| c == command)
    }

    pub fn clear(&self) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.clear();
        }
    }
}

// ============================================================================
// Mock Surface
// ============================================================================

#[derive(Debug)]
pub struct MockSurface {
    pub id: SurfaceId,
    pub extent: Extent2D,
    pub is_cube: bool,
    pub is_depth_stencil: bool,
}

impl Surface for MockSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn is_cube(&self) -> bool {
        self.is_cube
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    log: CommandLog,
    next_surface_id: u64,
    live_surfaces: FxHashMap<SurfaceId, Extent2D>,
    stale_accesses: usize,
    bound: Option<SurfaceId>,
    max_samples: u32,
    fail_allocations: bool,
    fail_read_pixels: bool,
    render_size: PhysicalSize<u32>,
    resize_observable: Observable<PhysicalSize<u32>>,
}

impl MockGraphicsDevice {
    pub fn new(log: CommandLog) -> Self {
        Self {
            log,
            next_surface_id: 1,
            live_surfaces: FxHashMap::default(),
            stale_accesses: 0,
            bound: None,
            max_samples: 4,
            fail_allocations: false,
            fail_read_pixels: false,
            render_size: PhysicalSize::new(1024, 768),
            resize_observable: Observable::new(),
        }
    }

    /// Wrap into the shared handle the scene and render targets use
    pub fn into_shared(self) -> Arc<Mutex<MockGraphicsDevice>> {
        Arc::new(Mutex::new(self))
    }

    pub fn log(&self) -> &CommandLog {
        &self.log
    }

    /// Make every subsequent surface allocation fail
    pub fn set_fail_allocations(&mut self, fail: bool) {
        self.fail_allocations = fail;
    }

    /// Make `read_pixels` fail
    pub fn set_fail_read_pixels(&mut self, fail: bool) {
        self.fail_read_pixels = fail;
    }

    /// Highest sample count `update_sample_count` will grant
    pub fn set_max_samples(&mut self, max_samples: u32) {
        self.max_samples = max_samples.max(1);
    }

    /// Resize the main viewport and notify resize listeners
    pub fn resize_viewport(&mut self, width: u32, height: u32) {
        self.render_size = PhysicalSize::new(width, height);
        self.log.push(format!("viewport_resized {}x{}", width, height));
        let size = self.render_size;
        self.resize_observable.notify(&size);
    }

    /// Whether `id` is allocated and not yet released
    pub fn is_live(&self, id: SurfaceId) -> bool {
        self.live_surfaces.contains_key(&id)
    }

    pub fn live_surface_count(&self) -> usize {
        self.live_surfaces.len()
    }

    /// Number of calls that referenced an already released surface
    pub fn stale_accesses(&self) -> usize {
        self.stale_accesses
    }

    /// Surface currently bound as framebuffer
    pub fn bound_surface(&self) -> Option<SurfaceId> {
        self.bound
    }

    pub fn resize_listener_count(&self) -> usize {
        self.resize_observable.observer_count()
    }

    fn allocate(&mut self, extent: Extent2D, is_cube: bool, is_depth_stencil: bool) -> Result<Arc<dyn Surface>> {
        if self.fail_allocations {
            self.log.push(format!("allocation_failed {}x{}", extent.width, extent.height));
            return Err(Error::OutOfMemory);
        }
        let id = SurfaceId(self.next_surface_id);
        self.next_surface_id += 1;
        self.live_surfaces.insert(id, extent);
        Ok(Arc::new(MockSurface { id, extent, is_cube, is_depth_stencil }))
    }

    fn touch(&mut self, surface: &Arc<dyn Surface>) {
        if !self.is_live(surface.id()) {
            self.stale_accesses += 1;
            self.log.push(format!("stale_access {}", surface.id()));
        }
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new(CommandLog::new())
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_flat_surface(
        &mut self,
        size: Extent2D,
        _options: &RenderTargetOptions,
    ) -> Result<Arc<dyn Surface>> {
        let surface = self.allocate(size, false, false)?;
        self.log.push(format!("create_flat {} {}x{}", surface.id(), size.width, size.height));
        Ok(surface)
    }

    fn create_cube_surface(
        &mut self,
        size: u32,
        _options: &RenderTargetOptions,
    ) -> Result<Arc<dyn Surface>> {
        let surface = self.allocate(Extent2D::square(size), true, false)?;
        self.log.push(format!("create_cube {} {}", surface.id(), size));
        Ok(surface)
    }

    fn create_depth_stencil_surface(
        &mut self,
        size: Extent2D,
        options: &DepthStencilOptions,
    ) -> Result<Arc<dyn Surface>> {
        let surface = self.allocate(size, options.is_cube, true)?;
        self.log.push(format!(
            "create_depth_stencil {} {}x{} cube={}",
            surface.id(), size.width, size.height, options.is_cube
        ));
        Ok(surface)
    }

    fn attach_depth_stencil(&mut self, surface: &Arc<dyn Surface>, depth_stencil: &Arc<dyn Surface>) {
        self.touch(surface);
        self.touch(depth_stencil);
        self.log.push(format!("attach_depth_stencil {} {}", surface.id(), depth_stencil.id()));
    }

    fn release_surface(&mut self, surface: &Arc<dyn Surface>) {
        self.touch(surface);
        self.live_surfaces.remove(&surface.id());
        if self.bound == Some(surface.id()) {
            self.bound = None;
        }
        self.log.push(format!("release {}", surface.id()));
    }

    fn release_framebuffer_objects(&mut self, surface: &Arc<dyn Surface>) {
        self.touch(surface);
        self.log.push(format!("release_framebuffer_objects {}", surface.id()));
    }

    fn bind_framebuffer(
        &mut self,
        surface: &Arc<dyn Surface>,
        face: Option<u32>,
        _ignore_viewport: bool,
        depth_stencil: Option<&Arc<dyn Surface>>,
    ) {
        self.touch(surface);
        if let Some(depth_stencil) = depth_stencil {
            self.touch(depth_stencil);
        }
        self.bound = Some(surface.id());
        match face {
            Some(face) => self.log.push(format!("bind {} face={}", surface.id(), face)),
            None => self.log.push(format!("bind {}", surface.id())),
        }
    }

    fn unbind_framebuffer(
        &mut self,
        surface: &Arc<dyn Surface>,
        _is_cube: bool,
        on_complete: &mut dyn FnMut(),
    ) {
        self.touch(surface);
        self.bound = None;
        self.log.push(format!("unbind {}", surface.id()));
        on_complete();
    }

    fn clear(&mut self, color: Option<Color4>, flags: ClearFlags) {
        match color {
            Some(c) => self.log.push(format!(
                "clear {:?} ({}, {}, {}, {})", flags, c.r, c.g, c.b, c.a
            )),
            None => self.log.push(format!("clear {:?}", flags)),
        }
    }

    fn set_viewport(&mut self, viewport: &Viewport, required: Option<Extent2D>) {
        match required {
            Some(size) => self.log.push(format!(
                "set_viewport ({}, {}, {}, {}) {}x{}",
                viewport.x, viewport.y, viewport.width, viewport.height, size.width, size.height
            )),
            None => self.log.push(format!(
                "set_viewport ({}, {}, {}, {})",
                viewport.x, viewport.y, viewport.width, viewport.height
            )),
        }
    }

    fn generate_cube_mipmaps(&mut self, surface: &Arc<dyn Surface>) {
        self.touch(surface);
        self.log.push(format!("generate_cube_mipmaps {}", surface.id()));
    }

    fn update_sample_count(&mut self, surface: &Arc<dyn Surface>, requested: u32) -> u32 {
        self.touch(surface);
        let effective = requested.clamp(1, self.max_samples);
        self.log.push(format!("update_sample_count {} {}", surface.id(), effective));
        effective
    }

    fn read_pixels(&mut self, width: u32, height: u32) -> Result<Vec<u8>> {
        if self.fail_read_pixels {
            return Err(Error::BackendError("read_pixels not supported".to_string()));
        }
        self.log.push(format!("read_pixels {}x{}", width, height));
        // Row r is filled with the byte value r, so a vertical flip is observable
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for row in 0..height {
            pixels.extend(std::iter::repeat((row % 256) as u8).take(width as usize * 4));
        }
        Ok(pixels)
    }

    fn render_size(&self) -> PhysicalSize<u32> {
        self.render_size
    }

    fn resize_observable(&mut self) -> &mut Observable<PhysicalSize<u32>> {
        &mut self.resize_observable
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
