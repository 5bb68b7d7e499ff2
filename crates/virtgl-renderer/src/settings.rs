use std::time::Duration;

/// Renderer configuration.
///
/// Keep this structure small. Everything here has a working default; hosts
/// usually start from [`RendererSettings::from_env`].
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Log frames-per-second on presentation.
    pub show_fps_stats: bool,

    /// Window over which the FPS figure is averaged.
    pub fps_interval: Duration,

    /// Color a native window is cleared to when first registered.
    pub window_clear_color: [f32; 4],

    /// Size of the offscreen surface backing the internal context.
    pub pbuffer_size: (u32, u32),
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            show_fps_stats: false,
            fps_interval: Duration::from_secs(1),
            window_clear_color: [0.0, 0.0, 0.0, 1.0],
            pbuffer_size: (1, 1),
        }
    }
}

impl RendererSettings {
    /// Defaults, with `SHOW_FPS_STATS` (any value) enabling FPS logging.
    pub fn from_env() -> Self {
        Self {
            show_fps_stats: std::env::var_os("SHOW_FPS_STATS").is_some(),
            ..Self::default()
        }
    }
}
