use bitflags::bitflags;

/// Linked shader program name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(pub u32);

bitflags! {
    /// Buffers cleared by [`Gles::clear`].
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct ClearMask: u32 {
        const DEPTH = 0x0000_0100;
        const STENCIL = 0x0000_0400;
        const COLOR = 0x0000_4000;
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveMode {
    Triangles,
    TriangleStrip,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StringName {
    Vendor,
    Renderer,
    Version,
    Extensions,
}

/// The GL dispatch used by the compositor and by bootstrap probing.
///
/// Every call acts on whatever context is current on the calling thread.
/// Locations follow GL conventions: a negative location means "not present".
pub trait Gles: Send + Sync {
    fn get_string(&self, name: StringName) -> Option<String>;

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn color_mask(&self, r: bool, g: bool, b: bool, a: bool);
    fn clear(&self, mask: ClearMask);

    fn create_program(&self, vertex_src: &str, fragment_src: &str) -> Option<ProgramId>;
    fn attrib_location(&self, program: ProgramId, name: &str) -> i32;
    fn uniform_location(&self, program: ProgramId, name: &str) -> i32;
    fn use_program(&self, program: ProgramId);

    fn uniform_1i(&self, location: i32, value: i32);
    fn uniform_1f(&self, location: i32, value: f32);
    fn uniform_2f(&self, location: i32, x: f32, y: f32);
    fn uniform_matrix4(&self, location: i32, columns: &[f32; 16]);

    fn active_texture(&self, unit: u32);

    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);

    /// Client-side vertex array. `data` starts at the attribute's first
    /// component; `stride` is in bytes. The data is consumed by the next
    /// `draw_arrays` and must be copied if kept beyond it.
    fn vertex_attrib_pointer(&self, index: u32, components: i32, stride: usize, data: &[f32]);

    fn enable_blend(&self);
    fn blend_func_separate(
        &self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );

    fn draw_arrays(&self, mode: PrimitiveMode, first: i32, count: i32);
}
