//! Per-worker binding state.
//!
//! A worker is whatever caller-side execution unit issues guest commands
//! (usually one decoder thread per guest connection). Its state is created on
//! first use and dropped by [`Renderer::worker_exited`](crate::Renderer::worker_exited).

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::handle::Handle;
use crate::host::{ApiGeneration, Backend};

/// Caller-chosen identifier of a worker.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct WorkerId(pub u64);

/// Decoder routing target for one API generation.
pub(crate) struct DecoderSlot<C> {
    context: Option<Arc<C>>,
}

impl<C> DecoderSlot<C> {
    const fn empty() -> Self {
        Self { context: None }
    }

    #[inline]
    pub(crate) fn set_context_data(&mut self, context: Option<Arc<C>>) {
        self.context = context;
    }

    #[inline]
    pub(crate) fn context(&self) -> Option<&Arc<C>> {
        self.context.as_ref()
    }
}

/// Currently bound objects, kept alive while current.
pub(crate) struct CurrentBinding<B: Backend> {
    pub(crate) context: Option<(Handle, Arc<B::Context>)>,
    pub(crate) draw: Option<(Handle, Arc<B::Surface>)>,
    pub(crate) read: Option<(Handle, Arc<B::Surface>)>,
}

impl<B: Backend> CurrentBinding<B> {
    const fn none() -> Self {
        Self { context: None, draw: None, read: None }
    }

    pub(crate) fn handles(&self) -> BindingSnapshot {
        BindingSnapshot {
            context: self.context.as_ref().map(|(h, _)| *h),
            draw: self.draw.as_ref().map(|(h, _)| *h),
            read: self.read.as_ref().map(|(h, _)| *h),
        }
    }
}

pub(crate) struct ThreadBindingState<B: Backend> {
    pub(crate) owned_contexts: BTreeSet<Handle>,
    pub(crate) owned_windows: BTreeSet<Handle>,
    pub(crate) current: CurrentBinding<B>,
    legacy_decoder: DecoderSlot<B::Context>,
    modern_decoder: DecoderSlot<B::Context>,
}

impl<B: Backend> ThreadBindingState<B> {
    pub(crate) fn new() -> Self {
        Self {
            owned_contexts: BTreeSet::new(),
            owned_windows: BTreeSet::new(),
            current: CurrentBinding::none(),
            legacy_decoder: DecoderSlot::empty(),
            modern_decoder: DecoderSlot::empty(),
        }
    }

    #[inline]
    pub(crate) fn decoder(&self, api: ApiGeneration) -> &DecoderSlot<B::Context> {
        match api {
            ApiGeneration::Legacy => &self.legacy_decoder,
            ApiGeneration::Modern => &self.modern_decoder,
        }
    }

    #[inline]
    pub(crate) fn decoder_mut(&mut self, api: ApiGeneration) -> &mut DecoderSlot<B::Context> {
        match api {
            ApiGeneration::Legacy => &mut self.legacy_decoder,
            ApiGeneration::Modern => &mut self.modern_decoder,
        }
    }

    /// Clears the binding record and both decoder routes.
    pub(crate) fn clear_binding(&mut self) {
        self.current = CurrentBinding::none();
        self.legacy_decoder.set_context_data(None);
        self.modern_decoder.set_context_data(None);
    }

    pub(crate) fn snapshot(&self) -> WorkerSnapshot {
        WorkerSnapshot {
            binding: self.current.handles(),
            owned_contexts: self.owned_contexts.iter().copied().collect(),
            owned_windows: self.owned_windows.iter().copied().collect(),
        }
    }
}

/// Worker id → state, populated on first use.
pub(crate) struct Workers<B: Backend> {
    map: FxHashMap<WorkerId, ThreadBindingState<B>>,
}

impl<B: Backend> Workers<B> {
    pub(crate) fn new() -> Self {
        Self { map: FxHashMap::default() }
    }

    pub(crate) fn get(&self, worker: WorkerId) -> Option<&ThreadBindingState<B>> {
        self.map.get(&worker)
    }

    pub(crate) fn get_mut(&mut self, worker: WorkerId) -> Option<&mut ThreadBindingState<B>> {
        self.map.get_mut(&worker)
    }

    pub(crate) fn entry(&mut self, worker: WorkerId) -> &mut ThreadBindingState<B> {
        self.map.entry(worker).or_insert_with(ThreadBindingState::new)
    }

    pub(crate) fn remove(&mut self, worker: WorkerId) -> Option<ThreadBindingState<B>> {
        self.map.remove(&worker)
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
    }
}

/// Handles of the objects a worker has bound.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct BindingSnapshot {
    pub context: Option<Handle>,
    pub draw: Option<Handle>,
    pub read: Option<Handle>,
}

impl BindingSnapshot {
    #[inline]
    pub fn is_unbound(&self) -> bool {
        self.context.is_none() && self.draw.is_none() && self.read.is_none()
    }
}

/// Point-in-time view of a worker's state.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct WorkerSnapshot {
    pub binding: BindingSnapshot,
    /// Sorted ascending.
    pub owned_contexts: Vec<Handle>,
    /// Sorted ascending.
    pub owned_windows: Vec<Handle>,
}
