use bytemuck::{Pod, Zeroable};

use crate::coords::Rect;
use crate::host::PrimitiveMode;

/// Interleaved compositor vertex: position in output pixels, then texcoord.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
}

impl Vertex {
    /// Floats per vertex in the interleaved stream.
    pub(crate) const FLOATS: usize = 5;
    /// Offset of `texcoord` in floats.
    pub(crate) const TEXCOORD_OFFSET: usize = 3;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Primitive {
    pub mode: PrimitiveMode,
    pub vertices: [Vertex; 4],
}

impl Primitive {
    #[inline]
    pub fn floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// One triangle strip covering `rect`, sampling the top-left
/// `rect.width × rect.height` texels of a `buffer_width × buffer_height` buffer.
pub fn tessellate(rect: Rect, buffer_width: u32, buffer_height: u32) -> Primitive {
    let left = rect.left() as f32;
    let top = rect.top() as f32;
    let right = left + rect.width as f32;
    let bottom = top + rect.height as f32;

    let tex_right = texel_ratio(rect.width, buffer_width);
    let tex_bottom = texel_ratio(rect.height, buffer_height);

    let v = |x: f32, y: f32, u: f32, t: f32| Vertex {
        position: [x, y, 0.0],
        texcoord: [u, t],
    };

    Primitive {
        mode: PrimitiveMode::TriangleStrip,
        vertices: [
            v(left, top, 0.0, 0.0),
            v(left, bottom, 0.0, tex_bottom),
            v(right, top, tex_right, 0.0),
            v(right, bottom, tex_right, tex_bottom),
        ],
    }
}

#[inline]
fn texel_ratio(extent: i32, buffer_extent: u32) -> f32 {
    if buffer_extent == 0 {
        0.0
    } else {
        extent as f32 / buffer_extent as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn half_size_rect_samples_half_the_buffer() {
        let p = tessellate(Rect::new(0, 0, 32, 32), 64, 64);
        assert_eq!(p.mode, PrimitiveMode::TriangleStrip);

        let (min_u, max_u) = p
            .vertices
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v.texcoord[0]), hi.max(v.texcoord[0])));
        let (min_t, max_t) = p
            .vertices
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), v| (lo.min(v.texcoord[1]), hi.max(v.texcoord[1])));
        assert_relative_eq!(min_u, 0.0);
        assert_relative_eq!(max_u, 0.5);
        assert_relative_eq!(min_t, 0.0);
        assert_relative_eq!(max_t, 0.5);
    }

    #[test]
    fn strip_order_is_tl_bl_tr_br() {
        let p = tessellate(Rect::new(10, 20, 30, 40), 30, 40);
        let positions: Vec<[f32; 3]> = p.vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![[10.0, 20.0, 0.0], [10.0, 60.0, 0.0], [40.0, 20.0, 0.0], [40.0, 60.0, 0.0]]
        );
        assert_eq!(p.vertices[3].texcoord, [1.0, 1.0]);
    }

    #[test]
    fn rect_at_the_integer_limit_tessellates() {
        let p = tessellate(Rect::new(i32::MAX - 2, 0, 10, 10), 10, 10);
        assert!(p.vertices[2].position[0] >= p.vertices[0].position[0]);
        assert_eq!(p.vertices[3].position[1], 10.0);
    }

    #[test]
    fn interleaved_stream_layout() {
        let p = tessellate(Rect::new(1, 2, 3, 4), 3, 4);
        let floats = p.floats();
        assert_eq!(floats.len(), 4 * Vertex::FLOATS);
        assert_eq!(&floats[..Vertex::FLOATS], &[1.0, 2.0, 0.0, 0.0, 0.0]);
        assert_eq!(floats[Vertex::FLOATS + Vertex::TEXCOORD_OFFSET + 1], 1.0);
    }

    #[test]
    fn zero_sized_buffer_does_not_divide_by_zero() {
        let p = tessellate(Rect::new(0, 0, 8, 8), 0, 0);
        assert!(p.vertices.iter().all(|v| v.texcoord == [0.0, 0.0]));
    }
}
