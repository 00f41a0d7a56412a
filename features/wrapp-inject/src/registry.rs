use std::{collections::HashMap, fmt::Debug};

use crate::{
    cache::SingletonCache,
    dependency::{AsyncInject, Inject},
    dependency_graph::{DependencyGraph, DependencyGraphErrors},
    errors::BindError,
    producer::Producer,
    scope::Scope,
    types::Key,
};

/// A producer together with the scope its instances live in
#[derive(Debug, Clone)]
pub struct Binding {
    pub producer: Producer,
    pub scope: Scope,
}

/// The Binding Registry
///
/// Maps keys to bindings and owns the singleton cache of everything resolved through it.
/// Registering a key twice is allowed: the last binding wins.
#[derive(Default)]
pub struct Registry {
    bindings: HashMap<Key, Binding>,
    singletons: SingletonCache,
}
impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (key, binding) in &self.bindings {
            map.entry(&key.to_string(), &binding.scope.as_str());
        }
        map.finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Builds a registry from `(key, producer, scope)` triples
    pub fn from_bindings<K: Into<Key>>(
        bindings: impl IntoIterator<Item = (K, Producer, Scope)>,
    ) -> Result<Self, BindError> {
        let mut registry = Registry::new();
        for (key, producer, scope) in bindings {
            registry.bind(key, producer, scope)?;
        }
        Ok(registry)
    }

    /// Registers or overwrites the binding for `key`
    ///
    /// Type keys only accept producers supplying exactly that type.
    pub fn bind(
        &mut self,
        key: impl Into<Key>,
        producer: Producer,
        scope: Scope,
    ) -> Result<&mut Self, BindError> {
        let key = key.into();
        if matches!(&key, Key::Name(name) if name.is_empty()) {
            return Err(BindError::EmptyName);
        }
        if key.type_info().is_some_and(|info| info != producer.supplies()) {
            return Err(BindError::TypeMismatch {
                key,
                supplied: producer.supplies().type_name,
            });
        }

        tracing::debug!("Binding {} as {}", key, scope);
        if let Some(previous) = self.bindings.insert(key.clone(), Binding { producer, scope }) {
            tracing::debug!(
                "Binding for {} replaced a {} binding of {}",
                key,
                previous.scope,
                previous.producer.supplies()
            );
        }

        Ok(self)
    }

    /// Binds `T` to its own constructor
    pub fn bind_self<T: Inject>(&mut self, scope: Scope) -> &mut Self {
        self.insert_self(Producer::constructor::<T>(), scope)
    }

    /// Binds `T` to its own async constructor
    pub fn bind_self_async<T: AsyncInject>(&mut self, scope: Scope) -> &mut Self {
        self.insert_self(Producer::async_constructor::<T>(), scope)
    }

    fn insert_self(&mut self, producer: Producer, scope: Scope) -> &mut Self {
        let key = Key::Type(producer.supplies());
        tracing::debug!("Binding {} to itself as {}", key, scope);
        self.bindings.insert(key, Binding { producer, scope });
        self
    }

    pub fn singleton(
        &mut self,
        key: impl Into<Key>,
        producer: Producer,
    ) -> Result<&mut Self, BindError> {
        self.bind(key, producer, Scope::Singleton)
    }

    pub fn local(&mut self, key: impl Into<Key>, producer: Producer) -> Result<&mut Self, BindError> {
        self.bind(key, producer, Scope::Local)
    }

    pub fn transient(
        &mut self,
        key: impl Into<Key>,
        producer: Producer,
    ) -> Result<&mut Self, BindError> {
        self.bind(key, producer, Scope::Transient)
    }

    pub fn get(&self, key: &Key) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.bindings.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.bindings.keys()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Instances of singleton scoped producers realised through this registry
    pub fn singletons(&self) -> &SingletonCache {
        &self.singletons
    }

    /// Checks every binding for missing dependencies and eager cycles
    pub fn validate(&self) -> Result<(), DependencyGraphErrors> {
        DependencyGraph::new(self).check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arguments::Arguments, types::DynError};

    struct Service;
    impl Inject for Service {
        fn construct(_: &mut Arguments) -> Result<Self, DynError> {
            Ok(Service)
        }
    }

    #[test]
    fn last_binding_wins() {
        let first = Producer::value(1u32);
        let second = Producer::value(2u32);
        let mut registry = Registry::new();
        registry
            .local("port", first)
            .unwrap()
            .singleton("port", second.clone())
            .unwrap();

        let binding = registry.get(&Key::name("port")).unwrap();
        assert_eq!(binding.producer.id(), second.id());
        assert_eq!(binding.scope, Scope::Singleton);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut registry = Registry::new();
        assert_eq!(
            registry
                .transient("", Producer::value(1u8))
                .map(|_| ())
                .unwrap_err(),
            BindError::EmptyName
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn type_keys_require_the_supplied_type() {
        let mut registry = Registry::new();
        let error = registry
            .bind(Key::of::<String>(), Producer::value(1u8), Scope::Local)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(error, BindError::TypeMismatch { supplied: "u8", .. }));

        registry
            .bind(Key::of::<String>(), Producer::factory(String::new), Scope::Local)
            .unwrap();
        assert!(registry.contains(&Key::of::<String>()));
    }

    #[test]
    fn bind_self_uses_the_type_key() {
        let mut registry = Registry::new();
        registry.bind_self::<Service>(Scope::Singleton);

        let binding = registry.get(&Key::of::<Service>()).unwrap();
        assert_eq!(binding.scope, Scope::Singleton);
        assert_eq!(binding.producer.id(), Producer::constructor::<Service>().id());
    }

    #[test]
    fn from_bindings() {
        let registry = Registry::from_bindings([
            ("x", Producer::value("y"), Scope::Singleton),
            ("z", Producer::value("w"), Scope::Transient),
        ])
        .unwrap();
        assert_eq!(registry.get(&Key::name("x")).unwrap().scope, Scope::Singleton);
        assert_eq!(registry.get(&Key::name("z")).unwrap().scope, Scope::Transient);
        assert!(registry.get(&Key::name("y")).is_none());
    }
}
