use glam::{Mat4, Vec3};

use crate::coords::Rect;
use crate::native_window::DisplayRotation;

/// Vertical field of view of the compositor projection.
const FOV_Y_DEGREES: f32 = 30.0;

/// Output-pixel to clip-space transform for `viewport`.
///
/// A perspective projection whose z = 0 plane maps one-to-one onto output
/// pixels, top-left origin and +Y down. Points off that plane (renderables
/// transformed out of it) get perspective foreshortening.
pub fn screen_to_gl_coords(viewport: Rect) -> Mat4 {
    if viewport.is_empty() {
        return Mat4::IDENTITY;
    }

    let w = viewport.width as f32;
    let h = viewport.height as f32;
    let near = (h / 2.0) / (FOV_Y_DEGREES.to_radians() / 2.0).tan();
    let far = -near;

    let mut m = Mat4::from_translation(Vec3::new(-1.0, 1.0, 0.0));
    // w' = 1 - z
    m.z_axis.w = -1.0;
    m *= Mat4::from_scale(Vec3::new(2.0 / w, -2.0 / h, 2.0 / (near - far)));
    m *= Mat4::from_translation(Vec3::new(-viewport.left() as f32, -viewport.top() as f32, 0.0));
    m
}

/// Clockwise rotation of the whole output about the view axis.
pub fn display_transform(rotation: DisplayRotation) -> Mat4 {
    match rotation {
        DisplayRotation::None => Mat4::IDENTITY,
        r => Mat4::from_rotation_z(-(r.degrees() as f32).to_radians()),
    }
}
