//! The resolution algorithm
//!
//! Both resolvers walk the graph depth first, resolving the dependencies of a producer
//! in their declared order. Per requested dependency they:
//! 1. pick a binding: by name, then by type, then the declared type's own constructor
//! 2. return the cached instance of the binding's scope, if any
//! 3. fail if the producer is already being constructed in this call
//! 4. resolve the producer's eager dependencies and invoke it
//! 5. store the instance in its scope cache, then fill its lazy slots
//!
//! All bookkeeping of a single top-level call lives in a [Frame]. Singletons built during
//! a call stay staged in its frame and are published to their registry only once the call
//! succeeded. If another call published one of them first, the call is resolved again.

use std::{collections::HashSet, ptr, sync::Arc};

use crate::{
    cache::{LocalCache, SingletonCache},
    dependency::DependencyInfo,
    errors::ResolveError,
    producer::{Producer, ProducerId},
    registry::Registry,
    scope::Scope,
    types::{DynError, Instance, Key},
};

pub mod async_resolver;
pub mod sync_resolver;

/// Settings shared by every resolve call of a resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ResolverConfig {
    /// Scope of implicitly constructed types and of [crate::Resolver::call] targets
    pub default_scope: Scope,
    /// Longest resolution chain before giving up
    pub max_depth: usize,
}
impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            default_scope: Scope::Local,
            max_depth: 100,
        }
    }
}
impl ResolverConfig {
    pub fn with_default_scope(mut self, scope: Scope) -> Self {
        self.default_scope = scope;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// What a top-level call asks for
pub(crate) enum Request {
    /// The binding for a key, or the fallback if there is none
    Key { key: Key, fallback: Option<Producer> },
    /// A producer which is not bound
    Call(Producer),
}

/// A producer picked for a requested key
pub(crate) struct Target<'a> {
    pub(crate) key: Key,
    pub(crate) producer: Producer,
    pub(crate) scope: Scope,
    /// Registry whose singleton cache holds the instance
    pub(crate) owner: &'a Registry,
}

/// State of one top-level resolve call
pub(crate) struct Frame<'a> {
    registry: &'a Registry,
    overrides: Option<&'a Registry>,
    config: &'a ResolverConfig,
    local: LocalCache,
    /// Producers currently being constructed, per cache tier
    in_progress: HashSet<(ProducerId, Scope)>,
    /// Keys of the producers currently being constructed, outermost first
    chain: Vec<Key>,
    /// Singletons built by this call, not yet published
    staged: Vec<Staged<'a>>,
}

struct Staged<'a> {
    owner: &'a Registry,
    id: ProducerId,
    instance: Instance,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(
        registry: &'a Registry,
        overrides: Option<&'a Registry>,
        config: &'a ResolverConfig,
    ) -> Result<Self, ResolveError> {
        if let Some(overrides) = overrides {
            let mut collisions: Vec<Key> = overrides
                .keys()
                .filter(|key| registry.contains(key))
                .cloned()
                .collect();
            if !collisions.is_empty() {
                collisions.sort_by_cached_key(ToString::to_string);
                return Err(ResolveError::ConflictingBindings(collisions));
            }
        }

        Ok(Frame {
            registry,
            overrides,
            config,
            local: LocalCache::default(),
            in_progress: HashSet::new(),
            chain: Vec::new(),
            staged: Vec::new(),
        })
    }

    /// The binding for `key`, per-call bindings first
    fn bound(&self, key: &Key) -> Option<Target<'a>> {
        let (binding, owner) = self
            .overrides
            .and_then(|overrides| overrides.get(key).map(|binding| (binding, overrides)))
            .or_else(|| self.registry.get(key).map(|binding| (binding, self.registry)))?;

        Some(Target {
            key: key.clone(),
            producer: binding.producer.clone(),
            scope: binding.scope,
            owner,
        })
    }

    /// Target for an unbound producer
    pub(crate) fn implicit(&self, key: Key, producer: Producer) -> Target<'a> {
        Target {
            key,
            producer,
            scope: self.config.default_scope,
            owner: self.registry,
        }
    }

    /// Target of a top-level request
    pub(crate) fn target(&self, request: &Request) -> Result<Target<'a>, ResolveError> {
        match request {
            Request::Key { key, fallback } => self.target_for(key.clone(), fallback.clone()),
            Request::Call(producer) => {
                Ok(self.implicit(Key::Type(producer.supplies()), producer.clone()))
            }
        }
    }

    fn target_for(
        &self,
        key: Key,
        fallback: Option<Producer>,
    ) -> Result<Target<'a>, ResolveError> {
        if let Some(target) = self.bound(&key) {
            return Ok(target);
        }
        match fallback {
            Some(producer) => Ok(self.implicit(key, producer)),
            None => Err(self.unresolvable(key)),
        }
    }

    /// Target of a declared dependency
    ///
    /// Returns None for an optional dependency nothing applies to.
    pub(crate) fn plan(
        &self,
        dependency: &DependencyInfo,
    ) -> Result<Option<Target<'a>>, ResolveError> {
        if let Some(target) = self.bound(&dependency.name_key()) {
            return Ok(Some(target));
        }

        if let Some(type_key) = dependency.type_key() {
            if let Some(target) = self.bound(&type_key) {
                return Ok(Some(target));
            }
            if let Some(fallback) = dependency.fallback() {
                return Ok(Some(self.implicit(type_key, fallback)));
            }
        }

        if dependency.optional {
            tracing::trace!("Skipping optional dependency '{}'", dependency.name);
            return Ok(None);
        }

        Err(self.unresolvable(dependency.reported_key()))
    }

    fn unresolvable(&self, key: Key) -> ResolveError {
        tracing::debug!("Nothing is bound for {}", key);
        ResolveError::Unresolvable {
            chain: self.chain_to(&key),
            key,
        }
    }

    fn chain_to(&self, key: &Key) -> Vec<Key> {
        let mut chain = self.chain.clone();
        chain.push(key.clone());
        chain
    }

    /// The current resolution chain
    pub(crate) fn chain(&self) -> Vec<Key> {
        self.chain.clone()
    }

    fn cached(&self, target: &Target<'_>) -> Option<Instance> {
        let id = target.producer.id();
        match target.scope {
            Scope::Transient => None,
            Scope::Local => self.local.get(&id),
            Scope::Singleton => self
                .staged
                .iter()
                .find(|staged| staged.id == id && ptr::eq(staged.owner, target.owner))
                .map(|staged| staged.instance.clone())
                .or_else(|| target.owner.singletons().get(&id)),
        }
    }

    /// Starts constructing `target`
    ///
    /// Returns the cached instance if there is one, in which case [Frame::finish] must not be called.
    pub(crate) fn begin(
        &mut self,
        target: &Target<'_>,
    ) -> Result<Option<Instance>, ResolveError> {
        if let Some(instance) = self.cached(target) {
            tracing::trace!("Using cached {} instance of {}", target.scope, target.key);
            return Ok(Some(instance));
        }

        if self.chain.len() >= self.config.max_depth {
            return Err(ResolveError::MaxDepthExceeded {
                depth: self.config.max_depth,
                chain: self.chain_to(&target.key),
            });
        }

        if !self.in_progress.insert((target.producer.id(), target.scope)) {
            tracing::debug!("Circular dependency on {}", target.key);
            return Err(ResolveError::CircularDependency {
                key: target.key.clone(),
                chain: self.chain_to(&target.key),
            });
        }

        self.chain.push(target.key.clone());
        Ok(None)
    }

    /// Ends constructing `target`, whether it succeeded or not
    pub(crate) fn finish(&mut self, target: &Target<'_>) {
        self.in_progress.remove(&(target.producer.id(), target.scope));
        self.chain.pop();
    }

    /// Stores a freshly produced instance in its scope cache
    ///
    /// Singletons are staged until [Frame::publish].
    pub(crate) fn store(&mut self, target: &Target<'a>, instance: Instance) {
        let id = target.producer.id();
        match target.scope {
            Scope::Transient => {}
            Scope::Local => self.local.insert(id, instance),
            Scope::Singleton => self.staged.push(Staged {
                owner: target.owner,
                id,
                instance,
            }),
        }
    }

    /// Publishes the staged singletons of a successful call
    ///
    /// Returns false if another call published one of them first. Nothing is published
    /// then and the call must be resolved again.
    pub(crate) fn publish(self) -> bool {
        let count = self.staged.len();
        let published = SingletonCache::publish(
            self.staged
                .into_iter()
                .map(|staged| (staged.owner.singletons(), staged.id, staged.instance)),
        );
        if published && count > 0 {
            tracing::debug!("Published {} singletons", count);
        }
        published
    }

    /// Error for an async producer reached through the blocking resolver
    pub(crate) fn requires_async(&self, target: &Target<'_>) -> ResolveError {
        ResolveError::RequiresAsync {
            producer: target.producer.supplies().type_name,
            chain: self.chain(),
        }
    }
}

/// Error for a producer that returned one
pub(crate) fn producer_failed(target: &Target<'_>, error: DynError) -> ResolveError {
    tracing::debug!("Producer for {} failed: {}", target.key, error);
    ResolveError::ProducerFailed {
        producer: target.producer.supplies().type_name,
        error: Arc::new(error),
    }
}
