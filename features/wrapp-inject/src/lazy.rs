use std::{
    fmt::Debug,
    marker::PhantomData,
    sync::{Arc, OnceLock},
};

use crate::types::{Injectable, Instance};

/// Lazily injected dependency
///
/// Lazy slots are how cycles are closed: the owner is constructed with an empty slot,
/// stored in its scope cache, and the slot is filled right after. Anything requesting
/// the owner while its slots are being filled receives the cached owner.
///
/// ### Panics
///
/// [Lazy::get] panics if called before the slot was filled, that is from inside
/// the owner's own constructor, or after the resolution that created it failed.
pub struct Lazy<T: Injectable> {
    slot: Arc<LazySlot>,
    _marker: PhantomData<fn() -> T>,
}
impl<T: Injectable> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Lazy {
            slot: self.slot.clone(),
            _marker: PhantomData,
        }
    }
}
impl<T: Injectable + Debug> Debug for Lazy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slot.cell.get() {
            // Cycles would recurse forever through Debug
            Some(instance) => f.debug_tuple("Lazy").field(&instance.info.type_name).finish(),
            None => f.debug_tuple("Lazy").field(&"<unfilled>").finish(),
        }
    }
}

impl<T: Injectable> Lazy<T> {
    pub(crate) fn new(slot: Arc<LazySlot>) -> Self {
        Lazy {
            slot,
            _marker: PhantomData,
        }
    }

    /// Accesses the Lazy Dependency
    ///
    /// # Panics
    /// - When accessed before the slot was filled
    /// - When the filled instance is not a `T`
    pub fn get(&self) -> Arc<T> {
        self.try_get()
            .expect("Lazy inject accessed before it was filled")
    }

    /// Try to access the lazy dependency
    ///
    /// Returns None while unfilled, or if the filled instance is not a `T`.
    pub fn try_get(&self) -> Option<Arc<T>> {
        self.slot.cell.get().and_then(|instance| instance.downcast().ok())
    }

    pub fn is_filled(&self) -> bool {
        self.slot.cell.get().is_some()
    }
}

/// Shared storage behind a [Lazy]
#[derive(Default)]
pub(crate) struct LazySlot {
    cell: OnceLock<Instance>,
}
impl LazySlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns false if the slot was already filled
    pub(crate) fn fill(&self, instance: Instance) -> bool {
        self.cell.set(instance).is_ok()
    }
}
