use std::{any::type_name, borrow::Cow, sync::Arc};

use crate::{
    arguments::{downcast, Arguments, Slot},
    dependency::Inject,
    errors::ResolveError,
    lazy::LazySlot,
    producer::{Invocation, Producer},
    registry::Registry,
    types::{Injectable, Instance, Key},
};

use super::{producer_failed, Frame, Request, ResolverConfig, Target};

/// Resolves dependency graphs on the caller's thread
///
/// Every top-level call gets its own local cache. Singletons are cached in the registry,
/// so resolvers sharing a registry share its singletons.
/// Producers that need to suspend fail with [ResolveError::RequiresAsync],
/// use the [crate::AsyncResolver] for those.
#[derive(Debug, Default, Clone)]
pub struct Resolver {
    registry: Arc<Registry>,
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(registry: impl Into<Arc<Registry>>) -> Self {
        Self::with_config(registry, ResolverConfig::default())
    }

    pub fn with_config(registry: impl Into<Arc<Registry>>, config: ResolverConfig) -> Self {
        Resolver {
            registry: registry.into(),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves `T`, constructing it implicitly if it is not bound
    pub fn resolve<T: Inject>(&self) -> Result<Arc<T>, ResolveError> {
        let instance = self.run(None, Key::of::<T>(), Some(Producer::constructor::<T>()))?;
        downcast(&instance)
    }

    /// Like [Resolver::resolve], with per-call bindings
    pub fn resolve_with<T: Inject>(&self, overrides: &Registry) -> Result<Arc<T>, ResolveError> {
        let instance = self.run(
            Some(overrides),
            Key::of::<T>(),
            Some(Producer::constructor::<T>()),
        )?;
        downcast(&instance)
    }

    /// Resolves the binding of `T`, usually a trait object
    pub fn resolve_dyn<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        let instance = self.run(None, Key::of::<T>(), None)?;
        downcast_dyn(&instance)
    }

    pub fn resolve_dyn_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        overrides: &Registry,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self.run(Some(overrides), Key::of::<T>(), None)?;
        downcast_dyn(&instance)
    }

    /// Resolves the binding registered under `name`
    pub fn resolve_named<T: Injectable>(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self.run(None, Key::name(name), None)?;
        downcast(&instance)
    }

    pub fn resolve_named_with<T: Injectable>(
        &self,
        name: impl Into<Cow<'static, str>>,
        overrides: &Registry,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self.run(Some(overrides), Key::name(name), None)?;
        downcast(&instance)
    }

    /// Resolves the binding for `key` without knowing its type
    pub fn resolve_instance(&self, key: impl Into<Key>) -> Result<Instance, ResolveError> {
        self.run(None, key.into(), None)
    }

    /// Invokes a producer which is not bound, resolving its dependencies
    ///
    /// The producer is scoped by [ResolverConfig::default_scope].
    pub fn call<T: Injectable>(&self, producer: &Producer) -> Result<Arc<T>, ResolveError> {
        self.call_with(producer, &Registry::new())
    }

    pub fn call_with<T: Injectable>(
        &self,
        producer: &Producer,
        overrides: &Registry,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self.run_request(Some(overrides), Request::Call(producer.clone()))?;
        downcast(&instance)
    }

    fn run(
        &self,
        overrides: Option<&Registry>,
        key: Key,
        fallback: Option<Producer>,
    ) -> Result<Instance, ResolveError> {
        self.run_request(overrides, Request::Key { key, fallback })
    }

    /// Resolves `request` in a fresh frame until its singletons are published
    fn run_request(
        &self,
        overrides: Option<&Registry>,
        request: Request,
    ) -> Result<Instance, ResolveError> {
        loop {
            let mut frame = Frame::new(&self.registry, overrides, &self.config)?;
            let target = frame.target(&request)?;
            let key = target.key.clone();
            tracing::trace!("Resolving {}", key);

            let instance = self.build(&mut frame, target)?;
            if frame.publish() {
                return Ok(instance);
            }
            tracing::debug!(
                "Singletons for {} were published by another call, resolving again",
                key
            );
        }
    }

    fn build<'a>(
        &self,
        frame: &mut Frame<'a>,
        target: Target<'a>,
    ) -> Result<Instance, ResolveError> {
        if let Some(instance) = frame.begin(&target)? {
            return Ok(instance);
        }
        let result = self.build_uncached(frame, &target);
        frame.finish(&target);
        result
    }

    fn build_uncached<'a>(
        &self,
        frame: &mut Frame<'a>,
        target: &Target<'a>,
    ) -> Result<Instance, ResolveError> {
        let dependencies = target.producer.dependencies();
        let mut args = Arguments::with_capacity(dependencies.len());
        let mut deferred = Vec::new();

        for dependency in &dependencies {
            let Some(planned) = frame.plan(dependency)? else {
                args.push(dependency.name, Slot::Skipped);
                continue;
            };
            if dependency.lazy {
                let slot = LazySlot::new();
                args.push(dependency.name, Slot::Deferred(slot.clone()));
                deferred.push((slot, planned));
            } else {
                let instance = self.build(frame, planned)?;
                args.push(dependency.name, Slot::Resolved(instance));
            }
        }

        tracing::trace!("Invoking producer for {}", target.key);
        let instance = match target.producer.invoke(args) {
            Invocation::Ready(result) => result.map_err(|error| producer_failed(target, error))?,
            Invocation::Pending(_) => return Err(frame.requires_async(target)),
        };

        frame.store(target, instance.clone());

        for (slot, planned) in deferred {
            let filled = self.build(frame, planned)?;
            slot.fill(filled);
        }

        Ok(instance)
    }
}

pub(crate) fn downcast_dyn<T: ?Sized + Send + Sync + 'static>(
    instance: &Instance,
) -> Result<Arc<T>, ResolveError> {
    instance
        .downcast_dyn::<T>()
        .map_err(|actual_type| ResolveError::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type,
        })
}
