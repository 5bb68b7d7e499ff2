//! Native window registry.
//!
//! Each platform window the host composites into gets one presentation
//! surface created with the compositor config. The record also caches the
//! window's screen-to-clip and display-orientation matrices, recomputed on
//! every present and rotation change.

use glam::Mat4;
use raw_window_handle::RawWindowHandle;

use crate::binding::ScopedBind;
use crate::compositor::{display_transform, screen_to_gl_coords};
use crate::coords::Rect;
use crate::error::{RendererError, ResourceKind, Result};
use crate::host::{Backend, ClearMask, HostBinding, HostSurface};
use crate::renderer::Renderer;

/// Platform window identifier as the host display understands it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NativeWindow(u64);

impl NativeWindow {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Extracts the window id a host display accepts for window surfaces.
    ///
    /// Returns `None` for platforms without a native window surface path.
    pub fn from_raw_window_handle(handle: RawWindowHandle) -> Option<Self> {
        let raw = match handle {
            RawWindowHandle::Xlib(h) => h.window as u64,
            RawWindowHandle::Xcb(h) => u64::from(h.window.get()),
            RawWindowHandle::Wayland(h) => h.surface.as_ptr() as usize as u64,
            RawWindowHandle::Win32(h) => h.hwnd.get() as u64,
            RawWindowHandle::AppKit(h) => h.ns_view.as_ptr() as usize as u64,
            RawWindowHandle::AndroidNdk(h) => h.a_native_window.as_ptr() as usize as u64,
            _ => return None,
        };
        Some(Self(raw))
    }
}

/// Display orientation, applied after the screen-to-clip transform.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum DisplayRotation {
    #[default]
    None,
    Rot90,
    Rot180,
    Rot270,
}

impl DisplayRotation {
    /// Clockwise rotation in degrees.
    #[inline]
    pub const fn degrees(self) -> u32 {
        match self {
            DisplayRotation::None => 0,
            DisplayRotation::Rot90 => 90,
            DisplayRotation::Rot180 => 180,
            DisplayRotation::Rot270 => 270,
        }
    }
}

pub(crate) struct NativeWindowRecord {
    pub(crate) surface: HostSurface,
    pub(crate) viewport: Rect,
    pub(crate) rotation: DisplayRotation,
    pub(crate) screen_to_gl_coords: Mat4,
    pub(crate) display_transform: Mat4,
}

impl NativeWindowRecord {
    fn new(surface: HostSurface) -> Self {
        Self {
            surface,
            viewport: Rect::default(),
            rotation: DisplayRotation::None,
            screen_to_gl_coords: Mat4::IDENTITY,
            display_transform: Mat4::IDENTITY,
        }
    }

    pub(crate) fn set_viewport(&mut self, viewport: Rect) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.screen_to_gl_coords = screen_to_gl_coords(viewport);
        }
    }

    fn set_rotation(&mut self, rotation: DisplayRotation) {
        if rotation != self.rotation {
            self.rotation = rotation;
            self.display_transform = display_transform(rotation);
        }
    }
}

impl<B: Backend> Renderer<B> {
    /// Creates the presentation surface for `window` and clears it once.
    ///
    /// Registering an already known window is a no-op.
    pub fn create_native_window(&self, window: NativeWindow) -> Result<()> {
        let mut state = self.state.lock();
        if state.native_windows.contains_key(&window) {
            log::debug!("native window {:#x} already registered", window.raw());
            return Ok(());
        }

        let host = &self.core.backend;
        let surface = host
            .create_window_surface(self.core.config, window)
            .ok_or_else(|| RendererError::host_call("create_window_surface"))?;

        let prepared = ScopedBind::acquire(host, self.core.window_binding(surface)).and_then(|bind| {
            let [r, g, b, a] = self.settings.window_clear_color;
            host.clear_color(r, g, b, a);
            host.clear(ClearMask::COLOR | ClearMask::DEPTH | ClearMask::STENCIL);
            if !host.swap_buffers(surface) {
                log::debug!("initial swap on native window {:#x} failed", window.raw());
            }
            bind.release()
        });
        if let Err(err) = prepared {
            host.destroy_surface(surface);
            return Err(err);
        }

        state.native_windows.insert(window, NativeWindowRecord::new(surface));
        log::debug!("native window {:#x} registered", window.raw());
        Ok(())
    }

    /// Destroys the presentation surface of `window`. Unknown windows are ignored.
    pub fn destroy_native_window(&self, window: NativeWindow) {
        let mut state = self.state.lock();
        let Some(record) = state.native_windows.remove(&window) else {
            log::debug!("destroy of unknown native window {:#x} ignored", window.raw());
            return;
        };

        let host = &self.core.backend;
        if !host.make_current(HostBinding::NONE) {
            log::error!("failed to clear the current binding (host error {:#x})", host.last_error());
        }
        host.destroy_surface(record.surface);
    }

    pub fn set_display_rotation(&self, window: NativeWindow, rotation: DisplayRotation) -> Result<()> {
        let mut state = self.state.lock();
        let record = state
            .native_windows
            .get_mut(&window)
            .ok_or_else(|| RendererError::not_found(ResourceKind::NativeWindow, window.raw()))?;
        record.set_rotation(rotation);
        Ok(())
    }

    pub fn has_native_window(&self, window: NativeWindow) -> bool {
        self.state.lock().native_windows.contains_key(&window)
    }
}
