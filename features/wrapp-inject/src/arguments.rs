use std::{any::type_name, sync::Arc};

use crate::{
    errors::ResolveError,
    lazy::{Lazy, LazySlot},
    types::{Injectable, Instance},
};

pub(crate) enum Slot {
    Resolved(Instance),
    /// Optional dependency without a binding
    Skipped,
    /// Filled after the producer was invoked
    Deferred(Arc<LazySlot>),
}

/// The resolved inputs of a producer, in declared order
///
/// Arguments are looked up by their declared name.
#[derive(Default)]
pub struct Arguments {
    slots: Vec<(&'static str, Slot)>,
}

impl Arguments {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Arguments {
            slots: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: &'static str, slot: Slot) {
        self.slots.push((name, slot));
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Declared names in declared order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|(name, _)| *name)
    }

    fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots
            .iter()
            .find(|(declared, _)| *declared == name)
            .map(|(_, slot)| slot)
    }

    /// The raw instance behind a resolved argument
    pub fn instance(&self, name: &str) -> Option<&Instance> {
        match self.slot(name) {
            Some(Slot::Resolved(instance)) => Some(instance),
            _ => None,
        }
    }

    /// Takes a required argument
    pub fn get<T: Injectable>(&self, name: &str) -> Result<Arc<T>, ResolveError> {
        let instance = self
            .instance(name)
            .ok_or_else(|| ResolveError::MissingArgument(name.to_string()))?;
        downcast(instance)
    }

    /// Takes a required argument bound to a trait object
    pub fn get_dyn<T: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self
            .instance(name)
            .ok_or_else(|| ResolveError::MissingArgument(name.to_string()))?;
        instance
            .downcast_dyn::<T>()
            .map_err(|actual_type| ResolveError::DowncastFailed {
                required_type: type_name::<T>(),
                actual_type,
            })
    }

    /// Takes an argument declared as optional
    ///
    /// Returns None if it had no binding. A resolved argument of the wrong type is still an error.
    pub fn optional<T: Injectable>(&self, name: &str) -> Result<Option<Arc<T>>, ResolveError> {
        match self.slot(name) {
            Some(Slot::Resolved(instance)) => downcast(instance).map(Some),
            Some(Slot::Skipped) => Ok(None),
            _ => Err(ResolveError::MissingArgument(name.to_string())),
        }
    }

    /// Takes an argument declared as lazy
    pub fn lazy<T: Injectable>(&self, name: &str) -> Result<Lazy<T>, ResolveError> {
        match self.slot(name) {
            Some(Slot::Deferred(slot)) => Ok(Lazy::new(slot.clone())),
            _ => Err(ResolveError::MissingArgument(name.to_string())),
        }
    }
}

pub(crate) fn downcast<T: Injectable>(instance: &Instance) -> Result<Arc<T>, ResolveError> {
    instance
        .downcast()
        .map_err(|actual_type| ResolveError::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arguments() -> Arguments {
        let mut args = Arguments::with_capacity(3);
        args.push("port", Slot::Resolved(Instance::new(8080u16)));
        args.push("host", Slot::Skipped);
        args.push("peer", Slot::Deferred(LazySlot::new()));
        args
    }

    #[test]
    fn keeps_declared_order() {
        let args = arguments();
        assert_eq!(args.len(), 3);
        assert_eq!(args.names().collect::<Vec<_>>(), ["port", "host", "peer"]);
    }

    #[test]
    fn typed_access() {
        let args = arguments();
        assert_eq!(*args.get::<u16>("port").unwrap(), 8080);
        assert!(matches!(
            args.get::<u32>("port"),
            Err(ResolveError::DowncastFailed {
                actual_type: "u16",
                ..
            })
        ));
        assert!(matches!(
            args.get::<u16>("host"),
            Err(ResolveError::MissingArgument(name)) if name == "host"
        ));
    }

    #[test]
    fn optional_and_lazy_access() {
        let args = arguments();
        assert!(args.optional::<String>("host").unwrap().is_none());
        assert_eq!(*args.optional::<u16>("port").unwrap().unwrap(), 8080);
        assert!(args.optional::<u16>("unknown").is_err());

        let peer = args.lazy::<String>("peer").unwrap();
        assert!(!peer.is_filled());
        assert!(args.lazy::<u16>("port").is_err());
    }
}
