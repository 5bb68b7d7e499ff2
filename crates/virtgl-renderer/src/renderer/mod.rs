//! The resource orchestrator.
//!
//! One [`Renderer`] owns the host display objects it bootstrapped, every
//! guest-visible resource table and the per-worker binding records. All of
//! that state sits behind a single lock; operations are synchronous and leave
//! the state unchanged when they fail.

mod init;
mod resources;

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::caps::{Caps, GlStrings};
use crate::compositor::{ProgramKind, Programs};
use crate::configs::ConfigList;
use crate::error::ResourceKind;
use crate::handle::{Handle, HandleAllocator};
use crate::host::{ApiGeneration, Backend, HostBinding, HostSurface, ProgramId};
use crate::native_window::{NativeWindow, NativeWindowRecord};
use crate::settings::RendererSettings;
use crate::stats::FrameStats;
use crate::tables::{ColorBufferTable, ContextTable, ImageTable, Release, WindowTable};
use crate::worker::{WorkerId, WorkerSnapshot, Workers};

pub(crate) use init::HostCore;

/// GPU resource orchestrator over a host graphics [`Backend`].
///
/// Created once with [`Renderer::new`] and shared as `Arc<Renderer<B>>` by
/// every worker.
pub struct Renderer<B: Backend> {
    // Dropped before `core`: guest objects go before the host context.
    pub(crate) state: Mutex<State<B>>,
    pub(crate) core: HostCore<B>,
    configs: ConfigList,
    caps: Caps,
    gl_strings: GlStrings,
    pub(crate) programs: Programs,
    pub(crate) settings: RendererSettings,
}

pub(crate) struct State<B: Backend> {
    handles: HandleAllocator,
    pub(crate) contexts: ContextTable<B::Context>,
    pub(crate) windows: WindowTable<B::Surface>,
    pub(crate) color_buffers: ColorBufferTable<B::ColorBuffer>,
    pub(crate) images: ImageTable,
    pub(crate) workers: Workers<B>,
    pub(crate) native_windows: FxHashMap<NativeWindow, NativeWindowRecord>,
    pub(crate) stats: FrameStats,
    pub(crate) last_posted: Option<Handle>,
}

impl<B: Backend> State<B> {
    fn new(settings: &RendererSettings) -> Self {
        Self {
            handles: HandleAllocator::new(),
            contexts: ContextTable::new(ResourceKind::Context),
            windows: WindowTable::new(ResourceKind::WindowSurface),
            color_buffers: ColorBufferTable::new(ResourceKind::ColorBuffer),
            images: ImageTable::new(ResourceKind::ClientImage),
            workers: Workers::new(),
            native_windows: FxHashMap::default(),
            stats: FrameStats::new(settings.show_fps_stats, settings.fps_interval),
            last_posted: None,
        }
    }

    /// Handle for a new context or window surface.
    pub(crate) fn allocate_handle(&mut self) -> Handle {
        let (contexts, windows) = (&self.contexts, &self.windows);
        self.handles
            .allocate(|h| contexts.contains(h) || windows.contains(h))
    }

    pub(crate) fn allocate_color_buffer_handle(&mut self) -> Handle {
        let (contexts, windows, buffers) = (&self.contexts, &self.windows, &self.color_buffers);
        self.handles
            .allocate(|h| contexts.contains(h) || windows.contains(h) || buffers.contains(h))
    }

    pub(crate) fn allocate_image_handle(&mut self) -> Handle {
        let (contexts, windows, images) = (&self.contexts, &self.windows, &self.images);
        self.handles
            .allocate(|h| contexts.contains(h) || windows.contains(h) || images.contains(h))
    }

    /// Drops one reference; erases the entry at zero.
    pub(crate) fn close_color_buffer(&mut self, handle: Handle) {
        match self.color_buffers.release(handle) {
            Release::Missing => log::debug!("close of unknown color buffer {handle} ignored"),
            Release::Retained(left) => log::trace!("color buffer {handle} closed, {left} open"),
            Release::Removed(_) => log::debug!("color buffer {handle} released"),
        }
    }
}

impl<B: Backend> Renderer<B> {
    /// The host backend the renderer drives.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.core.backend
    }

    #[inline]
    pub fn caps(&self) -> Caps {
        self.caps
    }

    #[inline]
    pub fn gl_strings(&self) -> &GlStrings {
        &self.gl_strings
    }

    #[inline]
    pub fn configs(&self) -> &ConfigList {
        &self.configs
    }

    #[inline]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    /// Host program name used for `kind`.
    #[inline]
    pub fn program(&self, kind: ProgramKind) -> ProgramId {
        self.programs.get(kind).id
    }

    /// Context currently routed to `worker`'s decoder for `api`.
    pub fn decoder_context(&self, worker: WorkerId, api: ApiGeneration) -> Option<Arc<B::Context>> {
        let state = self.state.lock();
        state
            .workers
            .get(worker)
            .and_then(|w| w.decoder(api).context().cloned())
    }

    pub fn worker_snapshot(&self, worker: WorkerId) -> Option<WorkerSnapshot> {
        self.state.lock().workers.get(worker).map(|w| w.snapshot())
    }

    pub fn has_render_context(&self, handle: Handle) -> bool {
        self.state.lock().contexts.contains(handle)
    }

    pub fn has_window_surface(&self, handle: Handle) -> bool {
        self.state.lock().windows.contains(handle)
    }

    /// Open count of a color buffer, `None` once it has been erased.
    pub fn color_buffer_refcount(&self, handle: Handle) -> Option<u32> {
        self.state.lock().color_buffers.refcount(handle)
    }

    pub fn last_posted_color_buffer(&self) -> Option<Handle> {
        self.state.lock().last_posted
    }

    /// Successful presents since creation.
    pub fn frames_presented(&self) -> u64 {
        self.state.lock().stats.total_frames()
    }
}

impl<B: Backend> Drop for Renderer<B> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.workers.clear();
        state.images.clear();
        state.windows.clear();
        state.contexts.clear();
        state.color_buffers.clear();

        let host = &self.core.backend;
        for (_, record) in state.native_windows.drain() {
            host.destroy_surface(record.surface);
        }
        log::debug!("renderer tables cleared");
    }
}

impl<B: Backend> HostCore<B> {
    /// Offscreen pbuffer with the bookkeeping context.
    #[inline]
    pub(crate) fn offscreen_binding(&self) -> HostBinding {
        HostBinding::single(self.pbuf_surface, self.pbuf_context)
    }

    /// Presentation surface with the compositing context.
    #[inline]
    pub(crate) fn window_binding(&self, surface: HostSurface) -> HostBinding {
        HostBinding::single(surface, self.context)
    }
}

#[cfg(test)]
pub(crate) fn test_renderer() -> Arc<Renderer<crate::host::recording::RecordingBackend>> {
    Renderer::new(crate::host::recording::RecordingBackend::new(), RendererSettings::default())
        .expect("recording backend initializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_buffer_handles_never_collide_with_contexts() {
        let renderer = test_renderer();
        let worker = WorkerId(1);
        let mut seen = rustc_hash::FxHashSet::default();

        for _ in 0..16 {
            let context = renderer.create_render_context(worker, 0, None, ApiGeneration::Modern).unwrap();
            let window = renderer.create_window_surface(worker, 0, 4, 4).unwrap();
            let buffer = renderer.create_color_buffer(4, 4, 0x1908).unwrap();
            assert!(seen.insert(context));
            assert!(seen.insert(window));
            assert!(seen.insert(buffer));
        }
    }

    #[test]
    fn accessors_report_bootstrap_results() {
        let renderer = test_renderer();
        assert!(renderer.caps().has_eglimage_texture_2d);
        assert!(!renderer.gl_strings().vendor.is_empty());
        assert!(!renderer.configs().is_empty());
        assert_ne!(renderer.program(ProgramKind::Opaque), renderer.program(ProgramKind::Alpha));
        assert!(renderer.worker_snapshot(WorkerId(42)).is_none());
    }

    #[test]
    fn drop_releases_every_host_object() {
        let renderer = test_renderer();
        let backend = renderer.backend().clone();
        renderer.create_native_window(NativeWindow::new(3)).unwrap();
        renderer.create_render_context(WorkerId(1), 0, None, ApiGeneration::Legacy).unwrap();
        drop(renderer);

        assert_eq!(backend.live_contexts(), 0);
        assert_eq!(backend.live_pbuffer_surfaces(), 0);
        assert_eq!(backend.live_window_surfaces(), 0);
    }
}
