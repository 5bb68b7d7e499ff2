use std::collections::BTreeMap;

use anyhow::{Context, Result, ensure};
use virtgl_renderer::host::recording::{Call, RecordingBackend};
use virtgl_renderer::logging::{LoggingConfig, init_logging};
use virtgl_renderer::{
    GuestRenderer, Handle, NativeWindow, Rect, Renderable, Renderer, RendererSettings, WorkerId,
};

const OUTPUT: Rect = Rect::from_size(640, 480);
const WINDOW: NativeWindow = NativeWindow::new(0x1);
const GL_RGBA: u32 = 0x1908;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let backend = RecordingBackend::new();
    let renderer = Renderer::new(backend.clone(), RendererSettings::from_env())
        .context("renderer bootstrap failed")?;

    let strings = renderer.gl_strings();
    println!("host: {} / {} / {}", strings.vendor, strings.renderer, strings.version);
    println!("configs: {}", renderer.configs().len());

    let guest = GuestRenderer::new(renderer.clone(), WorkerId(1));

    let buffer = guest.create_color_buffer(OUTPUT.width as u32, OUTPUT.height as u32, GL_RGBA);
    let context = guest.create_render_context(0, 0, true);
    let surface = guest.create_window_surface(0, OUTPUT.width as u32, OUTPUT.height as u32);
    ensure!(buffer != 0 && context != 0 && surface != 0, "guest object creation failed");

    ensure!(guest.bind_context(context, surface, surface), "bind failed");
    ensure!(guest.set_window_surface_color_buffer(surface, buffer), "attach failed");
    ensure!(guest.flush_window_surface_color_buffer(surface), "flush failed");
    ensure!(guest.bind_context(0, 0, 0), "unbind failed");

    renderer
        .create_native_window(WINDOW)
        .context("native window registration failed")?;
    let buffer = Handle::new(buffer).context("zero color buffer handle")?;
    backend.clear_calls();

    renderer
        .present(WINDOW, OUTPUT, &[Renderable::new(buffer, OUTPUT)])
        .context("present failed")?;

    let mut summary: BTreeMap<&'static str, usize> = BTreeMap::new();
    for call in backend.calls() {
        *summary.entry(call_name(&call)).or_default() += 1;
    }
    println!("present issued:");
    for (name, count) in &summary {
        println!("  {name:<28} {count}");
    }

    drop(guest);
    renderer.destroy_native_window(WINDOW);
    log::info!("probe finished, {} frame(s) presented", renderer.frames_presented());
    Ok(())
}

fn call_name(call: &Call) -> &'static str {
    match call {
        Call::MakeCurrent(_) => "make_current",
        Call::SwapBuffers(_) => "swap_buffers",
        Call::Viewport(..) => "viewport",
        Call::ClearColor(_) => "clear_color",
        Call::ColorMask(_) => "color_mask",
        Call::Clear(_) => "clear",
        Call::UseProgram(_) => "use_program",
        Call::Uniform1i(..) => "uniform_1i",
        Call::Uniform1f(..) => "uniform_1f",
        Call::Uniform2f(..) => "uniform_2f",
        Call::UniformMatrix4(..) => "uniform_matrix4",
        Call::ActiveTexture(_) => "active_texture",
        Call::EnableVertexAttribArray(_) => "enable_vertex_attrib_array",
        Call::DisableVertexAttribArray(_) => "disable_vertex_attrib_array",
        Call::VertexAttribPointer { .. } => "vertex_attrib_pointer",
        Call::EnableBlend => "enable_blend",
        Call::BlendFuncSeparate(..) => "blend_func_separate",
        Call::DrawArrays(..) => "draw_arrays",
        Call::BindSurface { .. } => "bind_surface",
        Call::FlushColorBuffer => "flush_color_buffer",
        Call::BindColorBuffer => "bind_color_buffer",
    }
}
