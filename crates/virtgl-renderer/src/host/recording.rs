//! In-memory host that records every call.
//!
//! Simulates what the renderer relies on from a real display: per-thread
//! current bindings, object lifetimes and program locations. Failure switches
//! let tests drive the error paths.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::configs::PixelFormatConfig;
use crate::native_window::NativeWindow;

use super::{
    ApiGeneration, Backend, BlendFactor, ClearMask, ColorBuffer, ColorBufferDesc, ConfigRequest,
    Egl, Gles, HostBinding, HostConfig, HostContext, HostImage, HostSurface, PixelRegion,
    PrimitiveMode, ProgramId, RenderContext, RenderableType, StringName, SurfaceRole, SurfaceType,
    WindowSurface,
};

const EGL_SUCCESS: i32 = 0x3000;
const EGL_BAD_ACCESS: i32 = 0x3002;
const EGL_BAD_SURFACE: i32 = 0x300D;

const DEFAULT_EGL_EXTENSIONS: &str =
    "EGL_KHR_image_base EGL_KHR_gl_texture_2D_image EGL_KHR_gl_renderbuffer_image";
const GL_EXTENSIONS: &str = "GL_OES_EGL_image GL_OES_texture_npot";

const UNIFORMS: [&str; 6] = [
    "tex",
    "centre",
    "display_transform",
    "transform",
    "screen_to_gl_coords",
    "alpha",
];

/// A recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    MakeCurrent(HostBinding),
    SwapBuffers(HostSurface),
    Viewport(i32, i32, i32, i32),
    ClearColor([f32; 4]),
    ColorMask([bool; 4]),
    Clear(ClearMask),
    UseProgram(ProgramId),
    Uniform1i(i32, i32),
    Uniform1f(i32, f32),
    Uniform2f(i32, f32, f32),
    UniformMatrix4(i32, [f32; 16]),
    ActiveTexture(u32),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer {
        index: u32,
        components: i32,
        stride: usize,
        data: Vec<f32>,
    },
    EnableBlend,
    BlendFuncSeparate(BlendFactor, BlendFactor, BlendFactor, BlendFactor),
    DrawArrays(PrimitiveMode, i32, i32),
    BindSurface {
        surface: HostSurface,
        role: SurfaceRole,
        with_context: bool,
    },
    FlushColorBuffer,
    BindColorBuffer,
}

#[derive(Default)]
struct Failures {
    make_current: bool,
    swap: bool,
    programs: bool,
    destroy_image: bool,
}

#[derive(Default)]
struct Live {
    contexts: FxHashSet<NonZeroU64>,
    pbuffers: FxHashSet<NonZeroU64>,
    windows: FxHashSet<NonZeroU64>,
    images: FxHashSet<NonZeroU64>,
}

struct Inner {
    next_id: AtomicU64,
    last_error: AtomicI32,
    calls: Mutex<Vec<Call>>,
    bindings: Mutex<FxHashMap<ThreadId, HostBinding>>,
    live: Mutex<Live>,
    failures: Mutex<Failures>,
    configs: Mutex<Vec<PixelFormatConfig>>,
    egl_extensions: Mutex<String>,
    /// Program name → whether its fragment stage has an `alpha` uniform.
    programs: Mutex<FxHashMap<u32, bool>>,
}

impl Inner {
    fn fresh(&self) -> NonZeroU64 {
        NonZeroU64::MIN.saturating_add(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn destroy_context(&self, context: HostContext) {
        self.live.lock().contexts.remove(&context.0);
    }

    fn destroy_surface(&self, surface: HostSurface) {
        let mut live = self.live.lock();
        if !live.pbuffers.remove(&surface.0) && !live.windows.remove(&surface.0) {
            self.last_error.store(EGL_BAD_SURFACE, Ordering::Relaxed);
        }
    }
}

/// Host backend that keeps everything in memory and logs each call.
///
/// Clones share state, so a test can keep a handle on the backend after
/// moving one into a renderer.
#[derive(Clone)]
pub struct RecordingBackend {
    inner: Arc<Inner>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(0x1_0000),
                last_error: AtomicI32::new(EGL_SUCCESS),
                calls: Mutex::new(Vec::new()),
                bindings: Mutex::new(FxHashMap::default()),
                live: Mutex::new(Live::default()),
                failures: Mutex::new(Failures::default()),
                configs: Mutex::new(Self::default_configs()),
                egl_extensions: Mutex::new(DEFAULT_EGL_EXTENSIONS.to_owned()),
                programs: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    /// One dual-API config, one modern-only and one legacy-only.
    pub fn default_configs() -> Vec<PixelFormatConfig> {
        let config = |raw: u64, renderable_type, color_bits, depth_bits| PixelFormatConfig {
            host: HostConfig(NonZeroU64::MIN.saturating_add(raw)),
            renderable_type,
            surface_type: SurfaceType::WINDOW | SurfaceType::PBUFFER,
            color_bits,
            depth_bits,
            stencil_bits: 8,
        };
        vec![
            config(0, RenderableType::LEGACY | RenderableType::MODERN, [8, 8, 8, 8], 24),
            config(1, RenderableType::MODERN, [8, 8, 8, 0], 24),
            config(2, RenderableType::LEGACY, [5, 6, 5, 0], 16),
        ]
    }

    pub fn set_configs(&self, configs: impl IntoIterator<Item = PixelFormatConfig>) {
        *self.inner.configs.lock() = configs.into_iter().collect();
    }

    pub fn set_egl_extensions(&self, extensions: &str) {
        *self.inner.egl_extensions.lock() = extensions.to_owned();
    }

    pub fn fail_make_current(&self, fail: bool) {
        self.inner.failures.lock().make_current = fail;
    }

    pub fn fail_swap(&self, fail: bool) {
        self.inner.failures.lock().swap = fail;
    }

    pub fn fail_programs(&self, fail: bool) {
        self.inner.failures.lock().programs = fail;
    }

    pub fn fail_destroy_image(&self, fail: bool) {
        self.inner.failures.lock().destroy_image = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().clear();
    }

    pub fn live_contexts(&self) -> usize {
        self.inner.live.lock().contexts.len()
    }

    pub fn live_pbuffer_surfaces(&self) -> usize {
        self.inner.live.lock().pbuffers.len()
    }

    pub fn live_window_surfaces(&self) -> usize {
        self.inner.live.lock().windows.len()
    }

    pub fn live_images(&self) -> usize {
        self.inner.live.lock().images.len()
    }
}

impl Egl for RecordingBackend {
    fn initialize(&self) -> Option<(i32, i32)> {
        Some((1, 4))
    }

    fn configs(&self) -> Vec<PixelFormatConfig> {
        self.inner.configs.lock().clone()
    }

    fn choose_config(&self, request: &ConfigRequest) -> Option<HostConfig> {
        // The display always has the dual-API config, whatever `configs` reports.
        let dual = Self::default_configs().into_iter().next()?;
        let fits = dual.surface_type.contains(request.surface_type)
            && dual.renderable_type.contains(request.renderable_type)
            && dual.color_bits[..3].iter().all(|&b| b >= request.min_color_bits);
        fits.then_some(dual.host)
    }

    fn create_context(
        &self,
        _config: HostConfig,
        share: Option<HostContext>,
        _api: ApiGeneration,
    ) -> Option<HostContext> {
        let mut live = self.inner.live.lock();
        if share.is_some_and(|s| !live.contexts.contains(&s.0)) {
            return None;
        }
        let id = self.inner.fresh();
        live.contexts.insert(id);
        Some(HostContext(id))
    }

    fn destroy_context(&self, context: HostContext) {
        self.inner.destroy_context(context);
    }

    fn create_pbuffer_surface(&self, _config: HostConfig, width: u32, height: u32) -> Option<HostSurface> {
        if width == 0 || height == 0 {
            return None;
        }
        let id = self.inner.fresh();
        self.inner.live.lock().pbuffers.insert(id);
        Some(HostSurface(id))
    }

    fn create_window_surface(&self, _config: HostConfig, _window: NativeWindow) -> Option<HostSurface> {
        let id = self.inner.fresh();
        self.inner.live.lock().windows.insert(id);
        Some(HostSurface(id))
    }

    fn destroy_surface(&self, surface: HostSurface) {
        self.inner.destroy_surface(surface);
    }

    fn make_current(&self, binding: HostBinding) -> bool {
        if self.inner.failures.lock().make_current {
            self.inner.last_error.store(EGL_BAD_ACCESS, Ordering::Relaxed);
            return false;
        }
        let mut bindings = self.inner.bindings.lock();
        if binding.is_none() {
            bindings.remove(&thread::current().id());
        } else {
            bindings.insert(thread::current().id(), binding);
        }
        drop(bindings);
        self.inner.record(Call::MakeCurrent(binding));
        true
    }

    fn current_binding(&self) -> HostBinding {
        self.inner
            .bindings
            .lock()
            .get(&thread::current().id())
            .copied()
            .unwrap_or(HostBinding::NONE)
    }

    fn swap_buffers(&self, surface: HostSurface) -> bool {
        self.inner.record(Call::SwapBuffers(surface));
        if self.inner.failures.lock().swap {
            self.inner.last_error.store(EGL_BAD_SURFACE, Ordering::Relaxed);
            return false;
        }
        true
    }

    fn extensions(&self) -> String {
        self.inner.egl_extensions.lock().clone()
    }

    fn create_image(&self, _context: Option<HostContext>, _target: u32, buffer: u32) -> Option<HostImage> {
        if buffer == 0 {
            return None;
        }
        let id = self.inner.fresh();
        self.inner.live.lock().images.insert(id);
        Some(HostImage(id))
    }

    fn destroy_image(&self, image: HostImage) -> bool {
        if self.inner.failures.lock().destroy_image {
            self.inner.last_error.store(EGL_BAD_ACCESS, Ordering::Relaxed);
            return false;
        }
        self.inner.live.lock().images.remove(&image.0)
    }

    fn last_error(&self) -> i32 {
        self.inner.last_error.load(Ordering::Relaxed)
    }
}

impl Gles for RecordingBackend {
    fn get_string(&self, name: StringName) -> Option<String> {
        let value = match name {
            StringName::Vendor => "virtgl",
            StringName::Renderer => "recording",
            StringName::Version => "OpenGL ES 2.0 (recording)",
            StringName::Extensions => GL_EXTENSIONS,
        };
        Some(value.to_owned())
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.inner.record(Call::Viewport(x, y, width, height));
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.inner.record(Call::ClearColor([r, g, b, a]));
    }

    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool) {
        self.inner.record(Call::ColorMask([r, g, b, a]));
    }

    fn clear(&self, mask: ClearMask) {
        self.inner.record(Call::Clear(mask));
    }

    fn create_program(&self, _vertex_src: &str, fragment_src: &str) -> Option<ProgramId> {
        if self.inner.failures.lock().programs {
            return None;
        }
        let id = u32::try_from(self.inner.fresh().get()).ok()?;
        let has_alpha = fragment_src.contains("uniform float alpha");
        self.inner.programs.lock().insert(id, has_alpha);
        Some(ProgramId(id))
    }

    fn attrib_location(&self, _program: ProgramId, name: &str) -> i32 {
        match name {
            "position" => 0,
            "texcoord" => 1,
            _ => -1,
        }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> i32 {
        let Some(&has_alpha) = self.inner.programs.lock().get(&program.0) else {
            return -1;
        };
        if name == "alpha" && !has_alpha {
            return -1;
        }
        UNIFORMS
            .iter()
            .position(|u| *u == name)
            .and_then(|i| i32::try_from(i).ok())
            .unwrap_or(-1)
    }

    fn use_program(&self, program: ProgramId) {
        self.inner.record(Call::UseProgram(program));
    }

    fn uniform_1i(&self, location: i32, value: i32) {
        self.inner.record(Call::Uniform1i(location, value));
    }

    fn uniform_1f(&self, location: i32, value: f32) {
        self.inner.record(Call::Uniform1f(location, value));
    }

    fn uniform_2f(&self, location: i32, x: f32, y: f32) {
        self.inner.record(Call::Uniform2f(location, x, y));
    }

    fn uniform_matrix4(&self, location: i32, columns: &[f32; 16]) {
        self.inner.record(Call::UniformMatrix4(location, *columns));
    }

    fn active_texture(&self, unit: u32) {
        self.inner.record(Call::ActiveTexture(unit));
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.inner.record(Call::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.inner.record(Call::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(&self, index: u32, components: i32, stride: usize, data: &[f32]) {
        self.inner.record(Call::VertexAttribPointer {
            index,
            components,
            stride,
            data: data.to_vec(),
        });
    }

    fn enable_blend(&self) {
        self.inner.record(Call::EnableBlend);
    }

    fn blend_func_separate(
        &self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.inner
            .record(Call::BlendFuncSeparate(src_rgb, dst_rgb, src_alpha, dst_alpha));
    }

    fn draw_arrays(&self, mode: PrimitiveMode, first: i32, count: i32) {
        self.inner.record(Call::DrawArrays(mode, first, count));
    }
}

impl Backend for RecordingBackend {
    type ColorBuffer = RecordingColorBuffer;
    type Context = RecordingContext;
    type Surface = RecordingSurface;

    fn create_color_buffer(&self, desc: &ColorBufferDesc) -> Option<RecordingColorBuffer> {
        if desc.format == 0 || desc.width == 0 || desc.height == 0 {
            return None;
        }
        let len = (desc.width as usize)
            .checked_mul(desc.height as usize)?
            .checked_mul(4)?;
        Some(RecordingColorBuffer {
            inner: Arc::clone(&self.inner),
            width: desc.width,
            height: desc.height,
            pixels: Mutex::new(vec![0; len]),
        })
    }

    fn create_render_context(
        &self,
        config: &PixelFormatConfig,
        share: Option<&RecordingContext>,
        api: ApiGeneration,
    ) -> Option<RecordingContext> {
        let host = self.create_context(config.host, share.map(|s| s.host), api)?;
        Some(RecordingContext {
            inner: Arc::clone(&self.inner),
            host,
            api,
            decoder_data: (),
        })
    }

    fn create_guest_surface(
        &self,
        config: &PixelFormatConfig,
        width: u32,
        height: u32,
    ) -> Option<RecordingSurface> {
        let host = self.create_pbuffer_surface(config.host, width, height)?;
        Some(RecordingSurface {
            inner: Arc::clone(&self.inner),
            host,
            color_buffer: Mutex::new(None),
        })
    }
}

/// RGBA8 pixel storage regardless of the requested format.
pub struct RecordingColorBuffer {
    inner: Arc<Inner>,
    width: u32,
    height: u32,
    pixels: Mutex<Vec<u8>>,
}

impl RecordingColorBuffer {
    /// Calls `f(stored, packed)` with the byte offsets of every texel of
    /// `region` inside the buffer.
    fn for_each_texel(&self, region: &PixelRegion, mut f: impl FnMut(usize, usize)) {
        for row in 0..region.height.max(0) {
            for col in 0..region.width.max(0) {
                let (x, y) = (region.x + col, region.y + row);
                if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
                    continue;
                }
                let stored = (y as usize * self.width as usize + x as usize) * 4;
                let packed = (row as usize * region.width as usize + col as usize) * 4;
                f(stored, packed);
            }
        }
    }
}

impl ColorBuffer for RecordingColorBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn sub_update(&self, region: &PixelRegion, pixels: &[u8]) {
        let mut storage = self.pixels.lock();
        self.for_each_texel(region, |stored, packed| {
            if let (Some(dst), Some(src)) = (storage.get_mut(stored..stored + 4), pixels.get(packed..packed + 4)) {
                dst.copy_from_slice(src);
            }
        });
    }

    fn read_pixels(&self, region: &PixelRegion, pixels: &mut [u8]) {
        let storage = self.pixels.lock();
        self.for_each_texel(region, |stored, packed| {
            if let (Some(src), Some(dst)) = (storage.get(stored..stored + 4), pixels.get_mut(packed..packed + 4)) {
                dst.copy_from_slice(src);
            }
        });
    }

    fn bind_to_texture(&self) -> bool {
        true
    }

    fn bind_to_renderbuffer(&self) -> bool {
        true
    }

    fn bind(&self) {
        self.inner.record(Call::BindColorBuffer);
    }
}

pub struct RecordingContext {
    inner: Arc<Inner>,
    host: HostContext,
    api: ApiGeneration,
    decoder_data: (),
}

impl RenderContext for RecordingContext {
    type DecoderData = ();

    fn host_context(&self) -> HostContext {
        self.host
    }

    fn api(&self) -> ApiGeneration {
        self.api
    }

    fn decoder_data(&self) -> &() {
        &self.decoder_data
    }
}

impl Drop for RecordingContext {
    fn drop(&mut self) {
        self.inner.destroy_context(self.host);
    }
}

pub struct RecordingSurface {
    inner: Arc<Inner>,
    host: HostSurface,
    color_buffer: Mutex<Option<Arc<RecordingColorBuffer>>>,
}

impl WindowSurface for RecordingSurface {
    type Context = RecordingContext;
    type ColorBuffer = RecordingColorBuffer;

    fn host_surface(&self) -> HostSurface {
        self.host
    }

    fn bind(&self, context: Option<&Arc<RecordingContext>>, role: SurfaceRole) {
        self.inner.record(Call::BindSurface {
            surface: self.host,
            role,
            with_context: context.is_some(),
        });
    }

    fn set_color_buffer(&self, buffer: Arc<RecordingColorBuffer>) {
        *self.color_buffer.lock() = Some(buffer);
    }

    fn flush_color_buffer(&self) {
        self.inner.record(Call::FlushColorBuffer);
    }
}

impl Drop for RecordingSurface {
    fn drop(&mut self) {
        self.inner.destroy_surface(self.host);
    }
}
