//! Output geometry.
//!
//! Canonical space:
//! - output pixels
//! - origin top-left
//! - +X right, +Y down
//!
//! The compositor converts to clip space through the window's
//! screen-to-GL matrix.

mod rect;

pub use rect::Rect;
