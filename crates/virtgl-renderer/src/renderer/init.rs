use std::sync::Arc;

use parking_lot::Mutex;

use crate::binding::ScopedBind;
use crate::caps::{Caps, GlStrings};
use crate::compositor::Programs;
use crate::configs::ConfigList;
use crate::error::{InitError, Result};
use crate::host::{
    ApiGeneration, Backend, ConfigRequest, Egl, Gles, HostBinding, HostConfig, HostContext,
    HostSurface, RenderableType, StringName, SurfaceType,
};
use crate::settings::RendererSettings;

use super::{Renderer, State};

/// Host objects the renderer creates for itself: the compositing context and
/// the offscreen pbuffer pair used for bookkeeping.
///
/// Dropping it unbinds the calling thread and destroys all three.
pub(crate) struct HostCore<B: Backend> {
    pub(crate) backend: B,
    pub(crate) config: HostConfig,
    pub(crate) context: HostContext,
    pub(crate) pbuf_context: HostContext,
    pub(crate) pbuf_surface: HostSurface,
}

impl<B: Backend> Drop for HostCore<B> {
    fn drop(&mut self) {
        let host = &self.backend;
        if !host.make_current(HostBinding::NONE) {
            log::error!("failed to unbind during shutdown (host error {:#x})", host.last_error());
        }
        host.destroy_context(self.pbuf_context);
        host.destroy_context(self.context);
        host.destroy_surface(self.pbuf_surface);
        log::info!("host display objects released");
    }
}

/// Destroys the host objects it tracks unless disarmed.
struct Teardown<'a, E: Egl + ?Sized> {
    egl: &'a E,
    contexts: Vec<HostContext>,
    surfaces: Vec<HostSurface>,
}

impl<'a, E: Egl + ?Sized> Teardown<'a, E> {
    fn new(egl: &'a E) -> Self {
        Self {
            egl,
            contexts: Vec::new(),
            surfaces: Vec::new(),
        }
    }

    fn context(&mut self, context: HostContext) -> HostContext {
        self.contexts.push(context);
        context
    }

    fn surface(&mut self, surface: HostSurface) -> HostSurface {
        self.surfaces.push(surface);
        surface
    }

    fn disarm(mut self) {
        self.contexts.clear();
        self.surfaces.clear();
    }
}

impl<E: Egl + ?Sized> Drop for Teardown<'_, E> {
    fn drop(&mut self) {
        for context in self.contexts.drain(..).rev() {
            self.egl.destroy_context(context);
        }
        for surface in self.surfaces.drain(..) {
            self.egl.destroy_surface(surface);
        }
    }
}

fn create_failed<E: Egl + ?Sized>(egl: &E, what: &'static str) -> InitError {
    let code = egl.last_error();
    log::error!("failed to create the {what} (host error {code:#x})");
    InitError::Create { what, code }
}

/// Extension string of a throwaway legacy-API context.
///
/// The image extensions the compositor relies on are only advertised on the
/// legacy API, so it needs a context of its own.
fn legacy_extensions<H: Egl + Gles + ?Sized>(host: &H) -> Option<String> {
    let config = host.choose_config(&ConfigRequest {
        surface_type: SurfaceType::PBUFFER,
        renderable_type: RenderableType::LEGACY,
        min_color_bits: 0,
    })?;

    let mut teardown = Teardown::new(host);
    let surface = teardown.surface(host.create_pbuffer_surface(config, 1, 1)?);
    let context = teardown.context(host.create_context(config, None, ApiGeneration::Legacy)?);

    let bind = ScopedBind::acquire(host, HostBinding::single(surface, context)).ok()?;
    let extensions = host.get_string(StringName::Extensions);
    drop(bind);
    extensions
}

impl<B: Backend> Renderer<B> {
    /// Brings up the host display and the compositor.
    ///
    /// Every host object created before a failure is destroyed before the
    /// error is returned.
    pub fn new(backend: B, settings: RendererSettings) -> Result<Arc<Self>> {
        let version = backend.initialize().ok_or(InitError::Display)?;
        log::info!("host display {}.{} initialized", version.0, version.1);

        let legacy_exts = legacy_extensions(&backend).ok_or(InitError::LegacyExtensions)?;

        let config = backend
            .choose_config(&ConfigRequest {
                surface_type: SurfaceType::WINDOW | SurfaceType::PBUFFER,
                renderable_type: RenderableType::MODERN,
                min_color_bits: 1,
            })
            .ok_or(InitError::NoCompositorConfig)?;

        let mut teardown = Teardown::new(&backend);
        let context = backend
            .create_context(config, None, ApiGeneration::Modern)
            .ok_or_else(|| create_failed(&backend, "compositor context"))?;
        let context = teardown.context(context);

        let pbuf_context = backend
            .create_context(config, Some(context), ApiGeneration::Modern)
            .ok_or_else(|| create_failed(&backend, "offscreen context"))?;
        let pbuf_context = teardown.context(pbuf_context);

        let (width, height) = settings.pbuffer_size;
        let pbuf_surface = backend
            .create_pbuffer_surface(config, width, height)
            .ok_or_else(|| create_failed(&backend, "offscreen surface"))?;
        let pbuf_surface = teardown.surface(pbuf_surface);

        let bind = ScopedBind::acquire(&backend, HostBinding::single(pbuf_surface, pbuf_context))
            .map_err(|_| InitError::MakeCurrent)?;

        let caps = Caps::probe(version, &legacy_exts, &backend.extensions());
        if !caps.has_eglimage_texture_2d {
            return Err(InitError::MissingExtension("EGL_KHR_gl_texture_2D_image").into());
        }

        let configs = ConfigList::new(backend.configs());
        if configs.is_empty() {
            return Err(InitError::NoConfigs.into());
        }
        if configs.count_renderable(RenderableType::LEGACY) == 0 {
            return Err(InitError::NoLegacyConfigs.into());
        }
        if configs.count_renderable(RenderableType::MODERN) == 0 {
            return Err(InitError::NoModernConfigs.into());
        }

        let gl_strings = GlStrings {
            vendor: backend.get_string(StringName::Vendor).unwrap_or_default(),
            renderer: backend.get_string(StringName::Renderer).unwrap_or_default(),
            version: backend.get_string(StringName::Version).unwrap_or_default(),
        };
        let programs = Programs::build(&backend)?;

        bind.release().map_err(|_| InitError::MakeCurrent)?;
        teardown.disarm();

        log::info!(
            "renderer ready: {} configs, {} / {} / {}",
            configs.len(),
            gl_strings.vendor,
            gl_strings.renderer,
            gl_strings.version
        );

        Ok(Arc::new(Self {
            state: Mutex::new(State::new(&settings)),
            core: HostCore {
                backend,
                config,
                context,
                pbuf_context,
                pbuf_surface,
            },
            configs,
            caps,
            gl_strings,
            programs,
            settings,
        }))
    }
}
