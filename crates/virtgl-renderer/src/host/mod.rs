//! Host graphics abstraction.
//!
//! The renderer never talks to a concrete graphics stack. It drives:
//! - [`Egl`]: display connection, configs, contexts, surfaces, current binding
//! - [`Gles`]: the GL subset used by bootstrap probing and the compositor
//! - [`Backend`]: factories for the per-handle collaborator objects
//!
//! Host object names (`HostContext`, `HostSurface`, ...) are opaque and never
//! exposed to the guest.

mod egl;
mod gles;
mod objects;

#[cfg(any(test, feature = "recording"))]
pub mod recording;

pub use egl::{
    ConfigRequest, Egl, HostBinding, HostConfig, HostContext, HostImage, HostSurface,
    RenderableType, SurfaceType,
};
pub use gles::{BlendFactor, ClearMask, Gles, PrimitiveMode, ProgramId, StringName};
pub use objects::{
    ApiGeneration, Backend, ColorBuffer, ColorBufferDesc, PixelRegion, RenderContext,
    SurfaceRole, WindowSurface,
};
