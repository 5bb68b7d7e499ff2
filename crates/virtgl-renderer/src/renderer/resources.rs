use std::sync::Arc;

use crate::binding::ScopedBind;
use crate::configs::PixelFormatConfig;
use crate::error::{RendererError, ResourceKind, Result};
use crate::handle::Handle;
use crate::host::{
    ApiGeneration, Backend, ColorBuffer, ColorBufferDesc, Egl, PixelRegion, RenderContext,
    WindowSurface,
};
use crate::tables::WindowEntry;
use crate::worker::WorkerId;

use super::{Renderer, State};

impl<B: Backend> Renderer<B> {
    /// Binds the offscreen pair for bookkeeping calls that need a context.
    fn offscreen(&self) -> Result<ScopedBind<'_, B>> {
        ScopedBind::acquire(&self.core.backend, self.core.offscreen_binding())
    }

    fn config(&self, id: u32) -> Result<&PixelFormatConfig> {
        self.configs()
            .get(id)
            .ok_or_else(|| RendererError::not_found(ResourceKind::Config, id))
    }

    // ── color buffers ─────────────────────────────────────────────────────

    /// Creates a color buffer with one open reference.
    pub fn create_color_buffer(&self, width: u32, height: u32, format: u32) -> Result<Handle> {
        let mut state = self.state.lock();

        let desc = ColorBufferDesc {
            width,
            height,
            format,
            external_image: self.caps().has_eglimage_texture_2d,
        };
        let buffer = {
            let _bind = self.offscreen()?;
            self.core.backend.create_color_buffer(&desc)
        }
        .ok_or_else(|| RendererError::host_call("create_color_buffer"))?;

        let handle = state.allocate_color_buffer_handle();
        state.color_buffers.insert(handle, Arc::new(buffer));
        log::debug!("color buffer {handle} created ({width}x{height}, format {format:#x})");
        Ok(handle)
    }

    /// Adds one open reference.
    pub fn open_color_buffer(&self, handle: Handle) -> Result<()> {
        self.state.lock().color_buffers.retain(handle).map(|_| ())
    }

    /// Drops one open reference; the buffer is erased when none remain.
    /// Closing an unknown handle is ignored.
    pub fn close_color_buffer(&self, handle: Handle) {
        self.state.lock().close_color_buffer(handle);
    }

    pub fn read_color_buffer(&self, handle: Handle, region: &PixelRegion, pixels: &mut [u8]) -> Result<()> {
        let state = self.state.lock();
        let buffer = state.color_buffers.get(handle)?;
        let _bind = self.offscreen()?;
        buffer.read_pixels(region, pixels);
        Ok(())
    }

    pub fn update_color_buffer(&self, handle: Handle, region: &PixelRegion, pixels: &[u8]) -> Result<()> {
        let state = self.state.lock();
        let buffer = state.color_buffers.get(handle)?;
        let _bind = self.offscreen()?;
        buffer.sub_update(region, pixels);
        Ok(())
    }

    /// Binds the buffer as the texture of the calling worker's current context.
    pub fn bind_color_buffer_to_texture(&self, handle: Handle) -> Result<()> {
        let state = self.state.lock();
        if state.color_buffers.get(handle)?.bind_to_texture() {
            Ok(())
        } else {
            Err(RendererError::host_call("bind_to_texture"))
        }
    }

    /// Binds the buffer as the renderbuffer of the calling worker's current context.
    pub fn bind_color_buffer_to_renderbuffer(&self, handle: Handle) -> Result<()> {
        let state = self.state.lock();
        if state.color_buffers.get(handle)?.bind_to_renderbuffer() {
            Ok(())
        } else {
            Err(RendererError::host_call("bind_to_renderbuffer"))
        }
    }

    // ── contexts and window surfaces ──────────────────────────────────────

    /// Creates a guest context owned by `worker`, optionally sharing objects
    /// with `share`.
    pub fn create_render_context(
        &self,
        worker: WorkerId,
        config_id: u32,
        share: Option<Handle>,
        api: ApiGeneration,
    ) -> Result<Handle> {
        let mut state = self.state.lock();
        let config = self.config(config_id)?;
        let share = share
            .map(|h| state.contexts.get(h).map(Arc::clone))
            .transpose()?;

        let context = self
            .core
            .backend
            .create_render_context(config, share.as_deref(), api)
            .ok_or_else(|| RendererError::host_call("create_render_context"))?;

        let handle = state.allocate_handle();
        state.contexts.insert(handle, Arc::new(context));
        state.workers.entry(worker).owned_contexts.insert(handle);
        log::debug!(
            "render context {handle} created for worker {} (client version {})",
            worker.0,
            api.client_version()
        );
        Ok(handle)
    }

    /// Creates a guest window surface owned by `worker`, with no color
    /// buffer attached.
    pub fn create_window_surface(&self, worker: WorkerId, config_id: u32, width: u32, height: u32) -> Result<Handle> {
        let mut state = self.state.lock();
        let config = self.config(config_id)?;

        let surface = self
            .core
            .backend
            .create_guest_surface(config, width, height)
            .ok_or_else(|| RendererError::host_call("create_window_surface"))?;

        let handle = state.allocate_handle();
        state.windows.insert(
            handle,
            WindowEntry {
                surface: Arc::new(surface),
                color_buffer: None,
            },
        );
        state.workers.entry(worker).owned_windows.insert(handle);
        Ok(handle)
    }

    /// Removes a context. Unknown handles are ignored.
    pub fn destroy_render_context(&self, worker: WorkerId, handle: Handle) {
        let mut state = self.state.lock();
        if state.contexts.remove(handle).is_none() {
            log::debug!("destroy of unknown render context {handle} ignored");
        }
        if let Some(thread) = state.workers.get_mut(worker) {
            thread.owned_contexts.remove(&handle);
        }
    }

    /// Removes a window surface. Unknown handles are ignored.
    ///
    /// The attached color buffer keeps its open count.
    pub fn destroy_window_surface(&self, worker: WorkerId, handle: Handle) {
        let mut state = self.state.lock();
        if state.windows.remove(handle).is_none() {
            log::debug!("destroy of unknown window surface {handle} ignored");
        }
        if let Some(thread) = state.workers.get_mut(worker) {
            thread.owned_windows.remove(&handle);
        }
    }

    /// Attaches `color_buffer` as the render target of `window`, replacing any
    /// previous attachment.
    pub fn set_window_surface_color_buffer(&self, window: Handle, color_buffer: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let state = &mut *state;
        let entry = state.windows.get_mut(window)?;
        let buffer = state.color_buffers.get(color_buffer)?;

        entry.surface.set_color_buffer(Arc::clone(buffer));
        entry.color_buffer = Some(color_buffer);
        Ok(())
    }

    /// Copies the window's rendered content into its attached color buffer.
    pub fn flush_window_surface_color_buffer(&self, window: Handle) -> Result<()> {
        let state = self.state.lock();
        state.windows.get(window)?.surface.flush_color_buffer();
        Ok(())
    }

    // ── client images ─────────────────────────────────────────────────────

    /// Wraps a guest object of `context` (or a context-less client buffer
    /// when `None`) in a host image.
    pub fn create_client_image(&self, context: Option<Handle>, target: u32, buffer: u32) -> Result<Handle> {
        let mut state = self.state.lock();
        let host_context = context
            .map(|h| state.contexts.get(h).map(|c| c.host_context()))
            .transpose()?;

        let image = self
            .core
            .backend
            .create_image(host_context, target, buffer)
            .ok_or_else(|| RendererError::host_call("create_image"))?;

        let handle = state.allocate_image_handle();
        state.images.insert(handle, image);
        Ok(handle)
    }

    /// Destroys a client image. Unknown handles are ignored.
    pub fn destroy_client_image(&self, handle: Handle) -> Result<()> {
        let mut state = self.state.lock();
        let Ok(&image) = state.images.get(handle) else {
            log::debug!("destroy of unknown client image {handle} ignored");
            return Ok(());
        };
        let host = &self.core.backend;
        if !host.destroy_image(image) {
            log::error!("destroy of client image {handle} failed (host error {:#x})", host.last_error());
            return Err(RendererError::host_call("destroy_image"));
        }
        state.images.remove(handle);
        Ok(())
    }

    // ── reclamation ───────────────────────────────────────────────────────

    /// Removes every context `worker` still owns.
    pub fn drain_contexts_for_worker(&self, worker: WorkerId) {
        drain_contexts(&mut *self.state.lock(), worker);
    }

    /// Removes every window surface `worker` still owns, closing the
    /// reference each one held on its attached color buffer.
    pub fn drain_windows_for_worker(&self, worker: WorkerId) {
        drain_windows(&mut *self.state.lock(), worker);
    }

    /// Reclaims everything `worker` owns and forgets its binding state.
    ///
    /// Call once when the worker goes away.
    pub fn worker_exited(&self, worker: WorkerId) {
        let mut state = self.state.lock();
        let bound = state
            .workers
            .get(worker)
            .is_some_and(|thread| !thread.current.handles().is_unbound());
        if bound && self.unbind_locked(&mut state, worker).is_err() {
            log::error!("worker {} exited with a binding that could not be released", worker.0);
        }
        drain_windows(&mut *state, worker);
        drain_contexts(&mut *state, worker);
        if state.workers.remove(worker).is_some() {
            log::debug!("worker {} state released", worker.0);
        }
    }
}

fn drain_contexts<B: Backend>(state: &mut State<B>, worker: WorkerId) {
    let Some(thread) = state.workers.get_mut(worker) else {
        return;
    };
    let owned = std::mem::take(&mut thread.owned_contexts);
    for handle in owned {
        state.contexts.remove(handle);
    }
}

fn drain_windows<B: Backend>(state: &mut State<B>, worker: WorkerId) {
    let Some(thread) = state.workers.get_mut(worker) else {
        return;
    };
    let owned = std::mem::take(&mut thread.owned_windows);
    for handle in owned {
        let Some(entry) = state.windows.remove(handle) else {
            continue;
        };
        if let Some(buffer) = entry.color_buffer {
            state.close_color_buffer(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::host::recording::{Call, RecordingBackend};
    use crate::renderer::test_renderer;

    const WORKER: WorkerId = WorkerId(7);
    const RGBA: u32 = 0x1908;
    const UNSIGNED_BYTE: u32 = 0x1401;

    fn region(width: i32, height: i32) -> PixelRegion {
        PixelRegion {
            x: 0,
            y: 0,
            width,
            height,
            format: RGBA,
            ty: UNSIGNED_BYTE,
        }
    }

    // ── color buffers ─────────────────────────────────────────────────────

    #[test]
    fn open_close_counts_references() {
        let renderer = test_renderer();
        let buffer = renderer.create_color_buffer(16, 16, RGBA).unwrap();
        for _ in 0..3 {
            renderer.open_color_buffer(buffer).unwrap();
        }
        assert_eq!(renderer.color_buffer_refcount(buffer), Some(4));

        for remaining in (1..4).rev() {
            renderer.close_color_buffer(buffer);
            assert_eq!(renderer.color_buffer_refcount(buffer), Some(remaining));
        }
        renderer.close_color_buffer(buffer);
        assert_eq!(renderer.color_buffer_refcount(buffer), None);
        assert!(renderer.open_color_buffer(buffer).unwrap_err().is_not_found());
        assert!(renderer.bind_color_buffer_to_texture(buffer).unwrap_err().is_not_found());
    }

    #[test]
    fn close_unknown_is_silent() {
        let renderer = test_renderer();
        let buffer = renderer.create_color_buffer(16, 16, RGBA).unwrap();
        renderer.close_color_buffer(Handle::new(0x4242).unwrap());
        assert_eq!(renderer.color_buffer_refcount(buffer), Some(1));
    }

    #[test]
    fn construction_failure_has_no_side_effects() {
        let renderer = test_renderer();
        let err = renderer.create_color_buffer(16, 16, 0).unwrap_err();
        assert_eq!(err, RendererError::HostCall("create_color_buffer"));

        let next = renderer.create_color_buffer(16, 16, RGBA).unwrap();
        assert_eq!(renderer.color_buffer_refcount(next), Some(1));
        assert!(renderer.backend().current_binding().is_none());
    }

    #[test]
    fn update_then_read_round_trips_through_the_offscreen_context() {
        let renderer = test_renderer();
        let buffer = renderer.create_color_buffer(2, 2, RGBA).unwrap();
        let pixels: Vec<u8> = (0..16).collect();
        renderer.update_color_buffer(buffer, &region(2, 2), &pixels).unwrap();

        let mut out = vec![0u8; 16];
        renderer.read_color_buffer(buffer, &region(2, 2), &mut out).unwrap();
        assert_eq!(out, pixels);

        let offscreen = renderer.core.offscreen_binding();
        let calls = renderer.backend().calls();
        assert!(calls.iter().any(|c| *c == Call::MakeCurrent(offscreen)));
        assert!(renderer.backend().current_binding().is_none());
    }

    #[test]
    fn unknown_config_is_not_found() {
        let renderer = test_renderer();
        let count = renderer.configs().len() as u32;
        let err = renderer
            .create_render_context(WORKER, count, None, ApiGeneration::Modern)
            .unwrap_err();
        assert_eq!(err, RendererError::NotFound { kind: ResourceKind::Config, handle: u64::from(count) });
        assert!(renderer.worker_snapshot(WORKER).is_none());
    }

    #[test]
    fn unknown_share_context_is_not_found() {
        let renderer = test_renderer();
        let err = renderer
            .create_render_context(WORKER, 0, Handle::new(0x99), ApiGeneration::Modern)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn shared_context_is_passed_to_the_host() {
        let renderer = test_renderer();
        let first = renderer.create_render_context(WORKER, 0, None, ApiGeneration::Modern).unwrap();
        let second = renderer
            .create_render_context(WORKER, 0, Some(first), ApiGeneration::Modern)
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(renderer.worker_snapshot(WORKER).unwrap().owned_contexts.len(), 2);
    }

    // ── windows ───────────────────────────────────────────────────────────

    #[test]
    fn attach_requires_both_handles() {
        let renderer = test_renderer();
        let window = renderer.create_window_surface(WORKER, 0, 8, 8).unwrap();
        let buffer = renderer.create_color_buffer(8, 8, RGBA).unwrap();
        let missing = Handle::new(0x5151).unwrap();

        assert!(renderer.set_window_surface_color_buffer(missing, buffer).unwrap_err().is_not_found());
        assert!(renderer.set_window_surface_color_buffer(window, missing).unwrap_err().is_not_found());
        renderer.set_window_surface_color_buffer(window, buffer).unwrap();
        // Attachment does not take a reference.
        assert_eq!(renderer.color_buffer_refcount(buffer), Some(1));

        renderer.flush_window_surface_color_buffer(window).unwrap();
        assert!(renderer.backend().calls().iter().any(|c| matches!(c, Call::FlushColorBuffer)));
        assert!(renderer.flush_window_surface_color_buffer(missing).unwrap_err().is_not_found());
    }

    #[test]
    fn destroy_is_idempotent() {
        let renderer = test_renderer();
        let context = renderer.create_render_context(WORKER, 0, None, ApiGeneration::Legacy).unwrap();
        let window = renderer.create_window_surface(WORKER, 0, 8, 8).unwrap();

        for _ in 0..2 {
            renderer.destroy_render_context(WORKER, context);
            renderer.destroy_window_surface(WORKER, window);
        }
        assert!(!renderer.has_render_context(context));
        assert!(!renderer.has_window_surface(window));
        let snapshot = renderer.worker_snapshot(WORKER).unwrap();
        assert!(snapshot.owned_contexts.is_empty());
        assert!(snapshot.owned_windows.is_empty());
    }

    // ── client images ─────────────────────────────────────────────────────

    #[test]
    fn client_images_are_table_handles() {
        let renderer = test_renderer();
        let context = renderer.create_render_context(WORKER, 0, None, ApiGeneration::Modern).unwrap();

        let image = renderer.create_client_image(Some(context), 0x30B1, 5).unwrap();
        assert_ne!(image, context);
        renderer.destroy_client_image(image).unwrap();
        renderer.destroy_client_image(image).unwrap();

        assert!(renderer.create_client_image(Handle::new(0x77), 0x30B1, 5).unwrap_err().is_not_found());
        assert_eq!(renderer.backend().live_images(), 0);
    }

    #[test]
    fn failed_image_destroy_keeps_the_entry() {
        let renderer = test_renderer();
        let image = renderer.create_client_image(None, 0x30B1, 5).unwrap();

        renderer.backend().fail_destroy_image(true);
        let err = renderer.destroy_client_image(image).unwrap_err();
        renderer.backend().fail_destroy_image(false);
        assert_eq!(err, RendererError::HostCall("destroy_image"));
        assert_eq!(renderer.backend().live_images(), 1);

        renderer.destroy_client_image(image).unwrap();
        assert_eq!(renderer.backend().live_images(), 0);
    }

    // ── drain ─────────────────────────────────────────────────────────────

    #[test]
    fn drain_reclaims_owned_objects_and_one_buffer_reference() {
        let renderer = test_renderer();
        let a = renderer.create_render_context(WORKER, 0, None, ApiGeneration::Modern).unwrap();
        let b = renderer.create_render_context(WORKER, 0, None, ApiGeneration::Legacy).unwrap();
        let x = renderer.create_window_surface(WORKER, 0, 8, 8).unwrap();
        let z = renderer.create_color_buffer(8, 8, RGBA).unwrap();
        renderer.open_color_buffer(z).unwrap();
        renderer.set_window_surface_color_buffer(x, z).unwrap();

        renderer.drain_windows_for_worker(WORKER);
        renderer.drain_contexts_for_worker(WORKER);

        assert!(!renderer.has_render_context(a));
        assert!(!renderer.has_render_context(b));
        assert!(!renderer.has_window_surface(x));
        assert_eq!(renderer.color_buffer_refcount(z), Some(1));

        let snapshot = renderer.worker_snapshot(WORKER).unwrap();
        assert!(snapshot.owned_contexts.is_empty());
        assert!(snapshot.owned_windows.is_empty());

        // Second drain is a no-op.
        renderer.drain_windows_for_worker(WORKER);
        assert_eq!(renderer.color_buffer_refcount(z), Some(1));
    }

    #[test]
    fn drain_leaves_other_workers_alone() {
        let renderer = test_renderer();
        let other = WorkerId(8);
        let mine = renderer.create_render_context(WORKER, 0, None, ApiGeneration::Modern).unwrap();
        let theirs = renderer.create_render_context(other, 0, None, ApiGeneration::Modern).unwrap();

        renderer.drain_contexts_for_worker(WORKER);
        renderer.drain_contexts_for_worker(WorkerId(1234));
        assert!(!renderer.has_render_context(mine));
        assert!(renderer.has_render_context(theirs));
    }

    #[test]
    fn worker_exit_forgets_the_worker() {
        let renderer = test_renderer();
        let context = renderer.create_render_context(WORKER, 0, None, ApiGeneration::Modern).unwrap();
        let window = renderer.create_window_surface(WORKER, 0, 8, 8).unwrap();
        renderer.bind(WORKER, Some(context), Some(window), Some(window)).unwrap();

        renderer.worker_exited(WORKER);
        assert!(renderer.worker_snapshot(WORKER).is_none());
        assert!(!renderer.has_render_context(context));
        assert!(renderer.decoder_context(WORKER, ApiGeneration::Modern).is_none());
    }

    #[test]
    fn worker_exit_releases_the_host_binding() {
        let renderer = test_renderer();
        let live = renderer.backend().live_contexts();
        let context = renderer.create_render_context(WORKER, 0, None, ApiGeneration::Legacy).unwrap();
        let window = renderer.create_window_surface(WORKER, 0, 8, 8).unwrap();
        renderer.bind(WORKER, Some(context), Some(window), Some(window)).unwrap();
        assert!(!renderer.backend().current_binding().is_none());

        renderer.worker_exited(WORKER);
        assert!(renderer.backend().current_binding().is_none());
        assert_eq!(renderer.backend().live_contexts(), live);
    }

    // ── concurrency ───────────────────────────────────────────────────────

    #[test]
    fn concurrent_workers_never_share_handles() {
        let renderer: Arc<Renderer<RecordingBackend>> = test_renderer();

        let workers: Vec<_> = (0..2u64)
            .map(|id| {
                let renderer = Arc::clone(&renderer);
                thread::spawn(move || {
                    let worker = WorkerId(100 + id);
                    let mut created = Vec::new();
                    for round in 0..50 {
                        created.push(renderer.create_render_context(worker, 0, None, ApiGeneration::Modern).unwrap());
                        created.push(renderer.create_window_surface(worker, 0, 4, 4).unwrap());
                        if round % 10 == 9 {
                            let snapshot = renderer.worker_snapshot(worker).unwrap();
                            for h in snapshot.owned_contexts.iter().chain(&snapshot.owned_windows) {
                                assert!(created.contains(h), "worker {id} sees foreign handle {h}");
                            }
                            renderer.drain_windows_for_worker(worker);
                            renderer.drain_contexts_for_worker(worker);
                        }
                    }
                    created
                })
            })
            .collect();

        let mut all: Vec<Handle> = workers.into_iter().flat_map(|w| w.join().unwrap()).collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
