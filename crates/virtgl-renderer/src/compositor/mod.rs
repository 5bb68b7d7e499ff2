//! Frame compositor.
//!
//! Draws a list of renderables (color buffers placed in output pixels) into a
//! native window's presentation surface:
//! - one triangle strip per renderable, in list order
//! - opaque program at alpha 1.0, alpha-scaled program below it
//! - premultiplied `(ONE, ONE_MINUS_SRC_ALPHA)` blending
//!
//! The guest's binding on the presenting thread is restored afterwards.

mod program;
mod tessellate;
mod transform;

use std::time::Instant;

use glam::Mat4;

use crate::binding::ScopedBind;
use crate::coords::Rect;
use crate::error::{RendererError, ResourceKind, Result};
use crate::handle::Handle;
use crate::host::{Backend, BlendFactor, ClearMask, ColorBuffer, Gles};
use crate::native_window::{NativeWindow, NativeWindowRecord};
use crate::renderer::Renderer;

pub use program::ProgramKind;
pub(crate) use program::{Program, Programs};
pub use tessellate::{Primitive, Vertex, tessellate};
pub use transform::{display_transform, screen_to_gl_coords};

/// A color buffer placed on the output.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Renderable {
    pub buffer: Handle,
    /// Destination rectangle in output pixels.
    pub screen_position: Rect,
    /// Applied about the centre of `screen_position`.
    pub transformation: Mat4,
    pub alpha: f32,
}

impl Renderable {
    pub fn new(buffer: Handle, screen_position: Rect) -> Self {
        Self {
            buffer,
            screen_position,
            transformation: Mat4::IDENTITY,
            alpha: 1.0,
        }
    }

    #[inline]
    pub fn with_transformation(mut self, transformation: Mat4) -> Self {
        self.transformation = transformation;
        self
    }

    #[inline]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }
}

impl<B: Backend> Renderer<B> {
    /// Composites `renderables` into `window` and swaps it.
    ///
    /// Renderables referring to unknown color buffers are skipped.
    pub fn present(&self, window: NativeWindow, output: Rect, renderables: &[Renderable]) -> Result<()> {
        let mut state = self.state.lock();
        let state = &mut *state;
        let record = state
            .native_windows
            .get_mut(&window)
            .ok_or_else(|| RendererError::not_found(ResourceKind::NativeWindow, window.raw()))?;

        let gl = &self.core.backend;
        let bind = ScopedBind::acquire(gl, self.core.window_binding(record.surface))?;
        record.set_viewport(output);

        gl.viewport(0, 0, output.width, output.height);
        gl.clear_color(0.0, 0.0, 0.0, 1.0);
        gl.color_mask(true, true, true, true);
        gl.clear(ClearMask::COLOR);

        let mut last_drawn = None;
        for renderable in renderables {
            let Ok(buffer) = state.color_buffers.get(renderable.buffer) else {
                continue;
            };
            let program = self.programs.get(ProgramKind::for_alpha(renderable.alpha));
            draw(gl, record, program, renderable, buffer.as_ref());
            last_drawn = Some(renderable.buffer);
        }

        if !gl.swap_buffers(record.surface) {
            log::debug!("swap failed (host error {:#x})", gl.last_error());
            return Err(RendererError::host_call("swap_buffers"));
        }
        bind.release()?;

        if last_drawn.is_some() {
            state.last_posted = last_drawn;
        }
        if let Some(fps) = state.stats.tick(Instant::now()) {
            log::info!("FPS: {fps:5.3}");
        }
        Ok(())
    }
}

fn draw<G, CB>(gl: &G, record: &NativeWindowRecord, program: &Program, renderable: &Renderable, buffer: &CB)
where
    G: Gles + ?Sized,
    CB: ColorBuffer + ?Sized,
{
    let primitive = tessellate(renderable.screen_position, buffer.width(), buffer.height());

    gl.use_program(program.id);
    gl.uniform_1i(program.tex_uniform, 0);
    gl.uniform_matrix4(program.display_transform_uniform, &record.display_transform.to_cols_array());
    gl.uniform_matrix4(program.screen_to_gl_coords_uniform, &record.screen_to_gl_coords.to_cols_array());
    gl.active_texture(0);

    let (cx, cy) = renderable.screen_position.centre();
    gl.uniform_2f(program.centre_uniform, cx, cy);
    gl.uniform_matrix4(program.transform_uniform, &renderable.transformation.to_cols_array());
    if let Some(alpha) = program.alpha_uniform {
        gl.uniform_1f(alpha, renderable.alpha);
    }

    gl.enable_vertex_attrib_array(program.position_attr);
    gl.enable_vertex_attrib_array(program.texcoord_attr);

    buffer.bind();

    let floats = primitive.floats();
    let stride = std::mem::size_of::<Vertex>();
    gl.vertex_attrib_pointer(program.position_attr, 3, stride, floats);
    gl.vertex_attrib_pointer(program.texcoord_attr, 2, stride, &floats[Vertex::TEXCOORD_OFFSET..]);

    gl.enable_blend();
    gl.blend_func_separate(
        BlendFactor::One,
        BlendFactor::OneMinusSrcAlpha,
        BlendFactor::One,
        BlendFactor::OneMinusSrcAlpha,
    );

    gl.draw_arrays(primitive.mode, 0, primitive.vertices.len() as i32);

    gl.disable_vertex_attrib_array(program.texcoord_attr);
    gl.disable_vertex_attrib_array(program.position_attr);
}
