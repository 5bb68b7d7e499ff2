//! Wire-level entry points for one guest connection.
//!
//! The command decoder speaks raw `u32` handles with `0` meaning "no object"
//! and reports failure through sentinels: `0` for creates, `-1` for open,
//! `false` for the rest. [`GuestRenderer`] maps those onto the typed
//! [`Renderer`] API for a single worker and reclaims the worker's objects
//! when dropped.

use std::sync::Arc;

use crate::handle::Handle;
use crate::host::{ApiGeneration, Backend, PixelRegion};
use crate::renderer::Renderer;
use crate::worker::WorkerId;

pub struct GuestRenderer<B: Backend> {
    renderer: Arc<Renderer<B>>,
    worker: WorkerId,
}

impl<B: Backend> GuestRenderer<B> {
    pub fn new(renderer: Arc<Renderer<B>>, worker: WorkerId) -> Self {
        Self { renderer, worker }
    }

    #[inline]
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    #[inline]
    pub fn renderer(&self) -> &Arc<Renderer<B>> {
        &self.renderer
    }

    /// Returns the new handle, or `0`.
    pub fn create_color_buffer(&self, width: u32, height: u32, format: u32) -> u32 {
        Handle::to_wire(self.renderer.create_color_buffer(width, height, format).ok())
    }

    /// Returns `0` on success, `-1` for an unknown handle.
    pub fn open_color_buffer(&self, color_buffer: u32) -> i32 {
        match Handle::new(color_buffer).map(|h| self.renderer.open_color_buffer(h)) {
            Some(Ok(())) => 0,
            _ => -1,
        }
    }

    pub fn close_color_buffer(&self, color_buffer: u32) {
        if let Some(handle) = Handle::new(color_buffer) {
            self.renderer.close_color_buffer(handle);
        }
    }

    /// `share` may be `0`. Returns the new handle, or `0`.
    pub fn create_render_context(&self, config: u32, share: u32, is_modern: bool) -> u32 {
        let share = Handle::new(share);
        let api = ApiGeneration::from_is_modern(is_modern);
        Handle::to_wire(
            self.renderer
                .create_render_context(self.worker, config, share, api)
                .ok(),
        )
    }

    pub fn destroy_render_context(&self, context: u32) {
        if let Some(handle) = Handle::new(context) {
            self.renderer.destroy_render_context(self.worker, handle);
        }
    }

    /// Returns the new handle, or `0`.
    pub fn create_window_surface(&self, config: u32, width: u32, height: u32) -> u32 {
        Handle::to_wire(
            self.renderer
                .create_window_surface(self.worker, config, width, height)
                .ok(),
        )
    }

    pub fn destroy_window_surface(&self, window: u32) {
        if let Some(handle) = Handle::new(window) {
            self.renderer.destroy_window_surface(self.worker, handle);
        }
    }

    /// All three `0` unbinds.
    pub fn bind_context(&self, context: u32, draw: u32, read: u32) -> bool {
        self.renderer
            .bind(
                self.worker,
                Handle::new(context),
                Handle::new(draw),
                Handle::new(read),
            )
            .is_ok()
    }

    pub fn set_window_surface_color_buffer(&self, window: u32, color_buffer: u32) -> bool {
        match (Handle::new(window), Handle::new(color_buffer)) {
            (Some(w), Some(c)) => self.renderer.set_window_surface_color_buffer(w, c).is_ok(),
            _ => false,
        }
    }

    pub fn flush_window_surface_color_buffer(&self, window: u32) -> bool {
        Handle::new(window)
            .is_some_and(|h| self.renderer.flush_window_surface_color_buffer(h).is_ok())
    }

    /// Leaves `pixels` untouched for an unknown handle.
    pub fn read_color_buffer(&self, color_buffer: u32, region: &PixelRegion, pixels: &mut [u8]) {
        if let Some(handle) = Handle::new(color_buffer) {
            self.renderer.read_color_buffer(handle, region, pixels).ok();
        }
    }

    pub fn update_color_buffer(&self, color_buffer: u32, region: &PixelRegion, pixels: &[u8]) -> bool {
        Handle::new(color_buffer)
            .is_some_and(|h| self.renderer.update_color_buffer(h, region, pixels).is_ok())
    }

    pub fn bind_color_buffer_to_texture(&self, color_buffer: u32) -> bool {
        Handle::new(color_buffer)
            .is_some_and(|h| self.renderer.bind_color_buffer_to_texture(h).is_ok())
    }

    pub fn bind_color_buffer_to_renderbuffer(&self, color_buffer: u32) -> bool {
        Handle::new(color_buffer)
            .is_some_and(|h| self.renderer.bind_color_buffer_to_renderbuffer(h).is_ok())
    }

    /// `context` may be `0` for client buffers. Returns the new handle, or `0`.
    pub fn create_client_image(&self, context: u32, target: u32, buffer: u32) -> u32 {
        Handle::to_wire(
            self.renderer
                .create_client_image(Handle::new(context), target, buffer)
                .ok(),
        )
    }

    pub fn destroy_client_image(&self, image: u32) -> bool {
        match Handle::new(image) {
            Some(handle) => self.renderer.destroy_client_image(handle).is_ok(),
            None => true,
        }
    }
}

impl<B: Backend> Drop for GuestRenderer<B> {
    fn drop(&mut self) {
        self.renderer.worker_exited(self.worker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::recording::RecordingBackend;
    use crate::renderer::test_renderer;

    const RGBA: u32 = 0x1908;

    fn guest() -> GuestRenderer<RecordingBackend> {
        GuestRenderer::new(test_renderer(), WorkerId(3))
    }

    #[test]
    fn creates_return_zero_on_failure() {
        let guest = guest();
        assert_eq!(guest.create_color_buffer(4, 4, 0), 0);
        assert_eq!(guest.create_render_context(99, 0, true), 0);
        assert_eq!(guest.create_render_context(0, 0xabc, true), 0);
        assert_eq!(guest.create_window_surface(99, 4, 4), 0);
        assert_eq!(guest.create_client_image(0, 0x30B1, 0), 0);

        assert_ne!(guest.create_color_buffer(4, 4, RGBA), 0);
        assert_ne!(guest.create_render_context(0, 0, false), 0);
    }

    #[test]
    fn open_reports_minus_one_for_unknown_handles() {
        let guest = guest();
        let buffer = guest.create_color_buffer(4, 4, RGBA);
        assert_eq!(guest.open_color_buffer(buffer), 0);
        assert_eq!(guest.open_color_buffer(0), -1);
        assert_eq!(guest.open_color_buffer(0xffff), -1);

        guest.close_color_buffer(0);
        guest.close_color_buffer(0xffff);
        assert_eq!(guest.renderer().color_buffer_refcount(Handle::new(buffer).unwrap()), Some(2));
    }

    #[test]
    fn boolean_calls_fail_on_unknown_handles() {
        let guest = guest();
        assert!(!guest.bind_context(0x10, 0x11, 0x11));
        assert!(!guest.set_window_surface_color_buffer(0, 0));
        assert!(!guest.flush_window_surface_color_buffer(0x12));
        assert!(!guest.bind_color_buffer_to_texture(0));
        assert!(!guest.bind_color_buffer_to_renderbuffer(0x13));

        let region = PixelRegion {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            format: RGBA,
            ty: 0x1401,
        };
        assert!(!guest.update_color_buffer(0x14, &region, &[0; 4]));
        let mut pixels = [7u8; 4];
        guest.read_color_buffer(0x14, &region, &mut pixels);
        assert_eq!(pixels, [7; 4]);
    }

    #[test]
    fn zero_triple_unbinds() {
        let guest = guest();
        let context = guest.create_render_context(0, 0, true);
        let window = guest.create_window_surface(0, 8, 8);
        assert!(guest.bind_context(context, window, window));
        assert!(!guest.bind_context(context, 0, window));
        assert!(guest.bind_context(0, 0, 0));

        let snapshot = guest.renderer().worker_snapshot(guest.worker()).unwrap();
        assert!(snapshot.binding.is_unbound());
    }

    #[test]
    fn drop_reclaims_the_worker() {
        let renderer = test_renderer();
        let guest = GuestRenderer::new(Arc::clone(&renderer), WorkerId(4));
        let context = guest.create_render_context(0, 0, true);
        let window = guest.create_window_surface(0, 8, 8);
        let buffer = guest.create_color_buffer(8, 8, RGBA);
        assert!(guest.set_window_surface_color_buffer(window, buffer));
        drop(guest);

        assert!(!renderer.has_render_context(Handle::new(context).unwrap()));
        assert!(!renderer.has_window_surface(Handle::new(window).unwrap()));
        // The window held the only reference.
        assert_eq!(renderer.color_buffer_refcount(Handle::new(buffer).unwrap()), None);
        assert!(renderer.worker_snapshot(WorkerId(4)).is_none());
    }
}
