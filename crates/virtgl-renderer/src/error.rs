use std::fmt;

/// Table a failed lookup was made against.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Context,
    WindowSurface,
    ColorBuffer,
    ClientImage,
    NativeWindow,
    Config,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Context => "render context",
            ResourceKind::WindowSurface => "window surface",
            ResourceKind::ColorBuffer => "color buffer",
            ResourceKind::ClientImage => "client image",
            ResourceKind::NativeWindow => "native window",
            ResourceKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Fatal errors raised while bringing up the host display.
///
/// None of these leave a partially constructed renderer behind: every host
/// object created before the failure is destroyed before the error is returned.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum InitError {
    #[error("failed to initialize the host display")]
    Display,
    #[error("could not query the legacy GL extension string")]
    LegacyExtensions,
    #[error("no host config satisfies the compositor requirements")]
    NoCompositorConfig,
    #[error("failed to create the {what} (host error {code:#x})")]
    Create { what: &'static str, code: i32 },
    #[error("failed to make the offscreen context current")]
    MakeCurrent,
    #[error("missing required extension {0}")]
    MissingExtension(&'static str),
    #[error("host exposes no pixel-format configs")]
    NoConfigs,
    #[error("host exposes no legacy-API configs")]
    NoLegacyConfigs,
    #[error("host exposes no modern-API configs")]
    NoModernConfigs,
    #[error("failed to build the {0} compositor program")]
    Program(&'static str),
}

/// Errors returned by renderer operations.
///
/// Per-call failures leave every table and binding record untouched.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum RendererError {
    #[error("renderer initialization failed: {0}")]
    Initialization(#[from] InitError),

    #[error("{kind} {handle:#x} not found")]
    NotFound { kind: ResourceKind, handle: u64 },

    #[error("host call {0} failed")]
    HostCall(&'static str),
}

impl RendererError {
    pub(crate) fn not_found(kind: ResourceKind, handle: impl Into<u64>) -> Self {
        let handle = handle.into();
        log::debug!("{kind} {handle:#x} not found");
        RendererError::NotFound { kind, handle }
    }

    pub(crate) fn host_call(call: &'static str) -> Self {
        log::error!("host call {call} failed");
        RendererError::HostCall(call)
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RendererError::NotFound { .. })
    }
}

pub type Result<T, E = RendererError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_handle_as_hex() {
        let err = RendererError::not_found(ResourceKind::ColorBuffer, 0x2au32);
        assert_eq!(err.to_string(), "color buffer 0x2a not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn init_error_converts_into_renderer_error() {
        let err: RendererError = InitError::MissingExtension("EGL_KHR_gl_texture_2D_image").into();
        assert!(matches!(err, RendererError::Initialization(InitError::MissingExtension(_))));
        assert!(!err.is_not_found());
    }
}
