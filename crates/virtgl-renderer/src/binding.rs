//! Guest binding protocol and the scoped internal bind.

use std::sync::Arc;

use crate::error::{RendererError, Result};
use crate::handle::Handle;
use crate::host::{Backend, Egl, HostBinding, RenderContext, SurfaceRole, WindowSurface};
use crate::renderer::{Renderer, State};
use crate::worker::{CurrentBinding, WorkerId};

/// Makes a host binding current for the lifetime of the guard.
///
/// The binding current at acquisition is restored when the guard is released
/// or dropped, so an early return cannot leak the internal binding into the
/// guest's thread.
#[must_use = "the previous binding is restored when the guard drops"]
pub(crate) struct ScopedBind<'a, E: Egl + ?Sized> {
    egl: &'a E,
    previous: Option<HostBinding>,
}

impl<'a, E: Egl + ?Sized> ScopedBind<'a, E> {
    pub(crate) fn acquire(egl: &'a E, target: HostBinding) -> Result<Self> {
        let previous = egl.current_binding();
        if !egl.make_current(target) {
            log::debug!("scoped bind failed (host error {:#x})", egl.last_error());
            return Err(RendererError::host_call("make_current"));
        }
        Ok(Self {
            egl,
            previous: Some(previous),
        })
    }

    /// Restores the previous binding now, reporting failure.
    pub(crate) fn release(mut self) -> Result<()> {
        if self.restore() {
            Ok(())
        } else {
            Err(RendererError::host_call("make_current"))
        }
    }

    fn restore(&mut self) -> bool {
        match self.previous.take() {
            Some(previous) => self.egl.make_current(previous),
            None => true,
        }
    }
}

impl<E: Egl + ?Sized> Drop for ScopedBind<'_, E> {
    fn drop(&mut self) {
        if !self.restore() {
            log::error!(
                "failed to restore the previous binding (host error {:#x})",
                self.egl.last_error()
            );
        }
    }
}

fn bind_surfaces<S: WindowSurface>(draw: &Arc<S>, read: &Arc<S>, context: Option<&Arc<S::Context>>) {
    if Arc::ptr_eq(draw, read) {
        draw.bind(context, SurfaceRole::ReadDraw);
    } else {
        draw.bind(context, SurfaceRole::Draw);
        read.bind(context, SurfaceRole::Read);
    }
}

impl<B: Backend> Renderer<B> {
    /// Makes `(context, draw, read)` current for `worker`, or unbinds when all
    /// three are `None`.
    ///
    /// On failure the worker's binding record and decoder routing are left as
    /// they were.
    pub fn bind(
        &self,
        worker: WorkerId,
        context: Option<Handle>,
        draw: Option<Handle>,
        read: Option<Handle>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if context.is_none() && draw.is_none() && read.is_none() {
            return self.unbind_locked(&mut state, worker);
        }
        let state = &mut *state;

        let (context_handle, context) = state.contexts.resolve(context)?;
        let context = Arc::clone(context);
        let (draw_handle, draw_entry) = state.windows.resolve(draw)?;
        let draw_surface = Arc::clone(&draw_entry.surface);
        let (read_handle, read_surface) = if read == draw {
            (draw_handle, Arc::clone(&draw_surface))
        } else {
            let (handle, entry) = state.windows.resolve(read)?;
            (handle, Arc::clone(&entry.surface))
        };

        let host = &self.core.backend;
        let binding = HostBinding {
            draw: Some(draw_surface.host_surface()),
            read: Some(read_surface.host_surface()),
            context: Some(context.host_context()),
        };
        if !host.make_current(binding) {
            log::debug!("bind failed (host error {:#x})", host.last_error());
            return Err(RendererError::host_call("make_current"));
        }
        bind_surfaces(&draw_surface, &read_surface, Some(&context));

        let api = context.api();
        let thread = state.workers.entry(worker);
        thread.current = CurrentBinding {
            context: Some((context_handle, Arc::clone(&context))),
            draw: Some((draw_handle, draw_surface)),
            read: Some((read_handle, read_surface)),
        };
        thread.decoder_mut(api).set_context_data(Some(context));
        Ok(())
    }

    pub(crate) fn unbind_locked(&self, state: &mut State<B>, worker: WorkerId) -> Result<()> {
        let host = &self.core.backend;
        if !host.make_current(HostBinding::NONE) {
            log::debug!("unbind failed (host error {:#x})", host.last_error());
            return Err(RendererError::host_call("make_current"));
        }

        let Some(thread) = state.workers.get_mut(worker) else {
            return Ok(());
        };
        if let (Some((_, draw)), Some((_, read))) = (&thread.current.draw, &thread.current.read) {
            bind_surfaces(draw, read, None);
        }
        thread.clear_binding();
        Ok(())
    }
}
