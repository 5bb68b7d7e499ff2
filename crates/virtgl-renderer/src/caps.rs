/// Host capabilities probed once at initialization.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Caps {
    pub egl_major: i32,
    pub egl_minor: i32,
    /// `EGL_KHR_gl_texture_2D_image` together with `GL_OES_EGL_image`.
    pub has_eglimage_texture_2d: bool,
    /// `EGL_KHR_gl_renderbuffer_image` together with `GL_OES_EGL_image`.
    pub has_eglimage_renderbuffer: bool,
}

impl Caps {
    pub(crate) fn probe(version: (i32, i32), legacy_gl_extensions: &str, egl_extensions: &str) -> Self {
        let has_oes_image = has_extension(legacy_gl_extensions, "GL_OES_EGL_image");
        Self {
            egl_major: version.0,
            egl_minor: version.1,
            has_eglimage_texture_2d: has_oes_image
                && has_extension(egl_extensions, "EGL_KHR_gl_texture_2D_image"),
            has_eglimage_renderbuffer: has_oes_image
                && has_extension(egl_extensions, "EGL_KHR_gl_renderbuffer_image"),
        }
    }
}

/// GL identification strings, cached so callers need no current context.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct GlStrings {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
}

/// Whole-token match in a space-separated extension string.
pub fn has_extension(extensions: &str, name: &str) -> bool {
    extensions.split_ascii_whitespace().any(|e| e == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match_is_whole_token() {
        let exts = "GL_OES_EGL_image_external GL_OES_EGL_image";
        assert!(has_extension(exts, "GL_OES_EGL_image"));
        assert!(!has_extension("GL_OES_EGL_image_external", "GL_OES_EGL_image"));
    }

    #[test]
    fn image_caps_require_the_gl_side() {
        let egl = "EGL_KHR_gl_texture_2D_image EGL_KHR_gl_renderbuffer_image";
        let caps = Caps::probe((1, 4), "GL_OES_EGL_image", egl);
        assert!(caps.has_eglimage_texture_2d);
        assert!(caps.has_eglimage_renderbuffer);
        assert_eq!((caps.egl_major, caps.egl_minor), (1, 4));

        let caps = Caps::probe((1, 4), "", egl);
        assert!(!caps.has_eglimage_texture_2d);
        assert!(!caps.has_eglimage_renderbuffer);
    }
}
