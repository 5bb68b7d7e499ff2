use crate::error::InitError;
use crate::host::{Gles, ProgramId};

const VERTEX_SHADER: &str = include_str!("shaders/compositor.vert");
const OPAQUE_FRAGMENT_SHADER: &str = include_str!("shaders/opaque.frag");
const ALPHA_FRAGMENT_SHADER: &str = include_str!("shaders/alpha.frag");

/// Which compositor program draws a renderable.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProgramKind {
    /// Plain texture sample, for fully opaque renderables.
    Opaque,
    /// Texture sample scaled by an `alpha` uniform.
    Alpha,
}

impl ProgramKind {
    #[inline]
    pub fn for_alpha(alpha: f32) -> Self {
        if alpha >= 1.0 { ProgramKind::Opaque } else { ProgramKind::Alpha }
    }
}

/// A linked compositor program and its resolved locations.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Program {
    pub(crate) id: ProgramId,
    pub(crate) position_attr: u32,
    pub(crate) texcoord_attr: u32,
    pub(crate) tex_uniform: i32,
    pub(crate) centre_uniform: i32,
    pub(crate) display_transform_uniform: i32,
    pub(crate) transform_uniform: i32,
    pub(crate) screen_to_gl_coords_uniform: i32,
    pub(crate) alpha_uniform: Option<i32>,
}

impl Program {
    fn link<G: Gles + ?Sized>(gl: &G, fragment_src: &str) -> Option<Self> {
        let id = gl.create_program(VERTEX_SHADER, fragment_src)?;
        let attrib = |name: &str| u32::try_from(gl.attrib_location(id, name)).ok();
        let alpha = gl.uniform_location(id, "alpha");

        Some(Self {
            id,
            position_attr: attrib("position")?,
            texcoord_attr: attrib("texcoord")?,
            tex_uniform: gl.uniform_location(id, "tex"),
            centre_uniform: gl.uniform_location(id, "centre"),
            display_transform_uniform: gl.uniform_location(id, "display_transform"),
            transform_uniform: gl.uniform_location(id, "transform"),
            screen_to_gl_coords_uniform: gl.uniform_location(id, "screen_to_gl_coords"),
            alpha_uniform: (alpha >= 0).then_some(alpha),
        })
    }
}

/// Both compositor programs, built once with the offscreen context current.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Programs {
    opaque: Program,
    alpha: Program,
}

impl Programs {
    pub(crate) fn build<G: Gles + ?Sized>(gl: &G) -> Result<Self, InitError> {
        let opaque = Program::link(gl, OPAQUE_FRAGMENT_SHADER).ok_or(InitError::Program("opaque"))?;
        let alpha = Program::link(gl, ALPHA_FRAGMENT_SHADER).ok_or(InitError::Program("alpha"))?;
        Ok(Self { opaque, alpha })
    }

    #[inline]
    pub(crate) fn get(&self, kind: ProgramKind) -> &Program {
        match kind {
            ProgramKind::Opaque => &self.opaque,
            ProgramKind::Alpha => &self.alpha,
        }
    }
}
