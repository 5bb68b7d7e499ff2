//! virtgl renderer crate.
//!
//! Host-side orchestrator for guest GPU virtualization: hands out opaque
//! handles for guest contexts, window surfaces, color buffers and images,
//! tracks which worker has what bound, and composites color buffers into
//! native windows.

pub mod caps;
pub mod compositor;
pub mod configs;
pub mod coords;
pub mod error;
pub mod guest;
pub mod handle;
pub mod host;
pub mod logging;
pub mod native_window;
pub mod settings;
pub mod stats;
pub mod worker;

mod binding;
mod renderer;
mod tables;

pub use caps::{Caps, GlStrings};
pub use compositor::{ProgramKind, Renderable};
pub use configs::{ConfigList, PixelFormatConfig};
pub use coords::Rect;
pub use error::{InitError, RendererError, ResourceKind, Result};
pub use guest::GuestRenderer;
pub use handle::Handle;
pub use native_window::{DisplayRotation, NativeWindow};
pub use renderer::Renderer;
pub use settings::RendererSettings;
pub use worker::{BindingSnapshot, WorkerId, WorkerSnapshot};
