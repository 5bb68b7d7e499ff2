use std::sync::Arc;

use crate::configs::PixelFormatConfig;

use super::{Egl, Gles, HostContext, HostSurface};

/// API generation a guest context targets. Selects which command decoder the
/// context is routed to once bound.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ApiGeneration {
    /// GLES 1.x fixed-function.
    Legacy,
    /// GLES 2.x and later.
    Modern,
}

impl ApiGeneration {
    #[inline]
    pub fn from_is_modern(is_modern: bool) -> Self {
        if is_modern { ApiGeneration::Modern } else { ApiGeneration::Legacy }
    }

    /// `EGL_CONTEXT_CLIENT_VERSION` for this generation.
    #[inline]
    pub fn client_version(self) -> i32 {
        match self {
            ApiGeneration::Legacy => 1,
            ApiGeneration::Modern => 2,
        }
    }
}

/// Role a window surface is bound in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SurfaceRole {
    Draw,
    Read,
    /// Same surface for both; some hosts require one merged call.
    ReadDraw,
}

/// Parameters for [`Backend::create_color_buffer`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ColorBufferDesc {
    pub width: u32,
    pub height: u32,
    /// GL internal format.
    pub format: u32,
    /// Whether the host can share the storage through `EGLImage` textures.
    pub external_image: bool,
}

/// Rectangle and pixel layout of a read-back or upload.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PixelRegion {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// GL pixel format.
    pub format: u32,
    /// GL pixel type.
    pub ty: u32,
}

/// Host pixel storage backing a guest color buffer.
///
/// `sub_update` and `read_pixels` expect a context to be current; the renderer
/// provides its offscreen context around them.
pub trait ColorBuffer: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn sub_update(&self, region: &PixelRegion, pixels: &[u8]);
    fn read_pixels(&self, region: &PixelRegion, pixels: &mut [u8]);
    /// Binds the storage as the texture of the guest's current context.
    fn bind_to_texture(&self) -> bool;
    /// Binds the storage as the renderbuffer of the guest's current context.
    fn bind_to_renderbuffer(&self) -> bool;
    /// Binds the storage as the sampling source of the compositor.
    fn bind(&self);
}

/// Host rendering context wrapping a guest context.
pub trait RenderContext: Send + Sync {
    /// State owned by the command decoder for this context.
    type DecoderData: Send + Sync;

    fn host_context(&self) -> HostContext;
    fn api(&self) -> ApiGeneration;
    fn decoder_data(&self) -> &Self::DecoderData;
}

/// Host render target backing a guest window surface.
pub trait WindowSurface: Send + Sync {
    type Context: RenderContext;
    type ColorBuffer: ColorBuffer;

    fn host_surface(&self) -> HostSurface;
    /// Attaches the surface to `context` (or detaches it when `None`).
    fn bind(&self, context: Option<&Arc<Self::Context>>, role: SurfaceRole);
    fn set_color_buffer(&self, buffer: Arc<Self::ColorBuffer>);
    /// Copies the rendered content into the attached color buffer.
    fn flush_color_buffer(&self);
}

/// Everything the renderer needs from the host: display entry points, GL
/// dispatch and factories for the per-handle collaborator objects.
pub trait Backend: Egl + Gles {
    type ColorBuffer: ColorBuffer;
    type Context: RenderContext;
    type Surface: WindowSurface<Context = Self::Context, ColorBuffer = Self::ColorBuffer>;

    fn create_color_buffer(&self, desc: &ColorBufferDesc) -> Option<Self::ColorBuffer>;

    fn create_render_context(
        &self,
        config: &PixelFormatConfig,
        share: Option<&Self::Context>,
        api: ApiGeneration,
    ) -> Option<Self::Context>;

    /// Guest-visible window surface; distinct from a native window's
    /// presentation surface.
    fn create_guest_surface(
        &self,
        config: &PixelFormatConfig,
        width: u32,
        height: u32,
    ) -> Option<Self::Surface>;
}
