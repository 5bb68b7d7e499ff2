use std::num::NonZeroU64;

use bitflags::bitflags;

use crate::configs::PixelFormatConfig;
use crate::native_window::NativeWindow;

use super::ApiGeneration;

/// Opaque host rendering context (an `EGLContext`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HostContext(pub NonZeroU64);

/// Opaque host drawable (an `EGLSurface`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HostSurface(pub NonZeroU64);

/// Opaque host framebuffer configuration (an `EGLConfig`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HostConfig(pub NonZeroU64);

/// Opaque host image (an `EGLImageKHR`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct HostImage(pub NonZeroU64);

/// The `(draw, read, context)` triple current on a host thread.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct HostBinding {
    pub draw: Option<HostSurface>,
    pub read: Option<HostSurface>,
    pub context: Option<HostContext>,
}

impl HostBinding {
    /// Nothing current.
    pub const NONE: HostBinding = HostBinding {
        draw: None,
        read: None,
        context: None,
    };

    /// `surface` used for both drawing and reading.
    #[inline]
    pub const fn single(surface: HostSurface, context: HostContext) -> Self {
        Self {
            draw: Some(surface),
            read: Some(surface),
            context: Some(context),
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

bitflags! {
    /// Client APIs a config can render with (`EGL_RENDERABLE_TYPE`).
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
    pub struct RenderableType: u32 {
        const LEGACY = 0x0001;
        const MODERN = 0x0004;
    }
}

bitflags! {
    /// Drawable kinds a config supports (`EGL_SURFACE_TYPE`).
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
    pub struct SurfaceType: u32 {
        const PBUFFER = 0x0001;
        const WINDOW = 0x0004;
    }
}

/// Minimum requirements passed to [`Egl::choose_config`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConfigRequest {
    pub surface_type: SurfaceType,
    pub renderable_type: RenderableType,
    /// Minimum bits per red/green/blue channel.
    pub min_color_bits: u8,
}

/// Display-level entry points of the host graphics stack.
///
/// Implementations wrap an initialized display connection. Binding calls are
/// thread-affine: `make_current` and `current_binding` act on the calling
/// thread only.
pub trait Egl: Send + Sync {
    /// Returns the display version on success.
    fn initialize(&self) -> Option<(i32, i32)>;

    /// Every config the display exposes, in enumeration order.
    fn configs(&self) -> Vec<PixelFormatConfig>;

    fn choose_config(&self, request: &ConfigRequest) -> Option<HostConfig>;

    fn create_context(
        &self,
        config: HostConfig,
        share: Option<HostContext>,
        api: ApiGeneration,
    ) -> Option<HostContext>;

    fn destroy_context(&self, context: HostContext);

    fn create_pbuffer_surface(
        &self,
        config: HostConfig,
        width: u32,
        height: u32,
    ) -> Option<HostSurface>;

    fn create_window_surface(&self, config: HostConfig, window: NativeWindow)
        -> Option<HostSurface>;

    fn destroy_surface(&self, surface: HostSurface);

    fn make_current(&self, binding: HostBinding) -> bool;

    fn current_binding(&self) -> HostBinding;

    fn swap_buffers(&self, surface: HostSurface) -> bool;

    /// Display extension string (`EGL_EXTENSIONS`).
    fn extensions(&self) -> String;

    fn create_image(
        &self,
        context: Option<HostContext>,
        target: u32,
        buffer: u32,
    ) -> Option<HostImage>;

    fn destroy_image(&self, image: HostImage) -> bool;

    /// Last error code, for diagnostics only.
    fn last_error(&self) -> i32;
}
