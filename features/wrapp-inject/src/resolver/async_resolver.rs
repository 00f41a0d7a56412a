use std::{borrow::Cow, sync::Arc};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    arguments::{downcast, Arguments, Slot},
    dependency::{AsyncInject, Inject},
    errors::ResolveError,
    lazy::LazySlot,
    producer::{Invocation, Producer},
    registry::Registry,
    types::{Injectable, Instance, Key},
};

use super::{
    producer_failed, sync_resolver::downcast_dyn, Frame, Request, ResolverConfig, Target,
};

/// Resolves dependency graphs as a single task
///
/// Sync producers are invoked inline, async producers are awaited.
/// Dependencies are resolved one after another in their declared order.
#[derive(Debug, Default, Clone)]
pub struct AsyncResolver {
    registry: Arc<Registry>,
    config: ResolverConfig,
}

impl AsyncResolver {
    pub fn new(registry: impl Into<Arc<Registry>>) -> Self {
        Self::with_config(registry, ResolverConfig::default())
    }

    pub fn with_config(registry: impl Into<Arc<Registry>>, config: ResolverConfig) -> Self {
        AsyncResolver {
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
    pub async fn resolve<T: Inject>(&self) -> Result<Arc<T>, ResolveError> {
        let instance = self
            .run(None, Key::of::<T>(), Some(Producer::constructor::<T>()))
            .await?;
        downcast(&instance)
    }

    pub async fn resolve_with<T: Inject>(
        &self,
        overrides: &Registry,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self
            .run(
                Some(overrides),
                Key::of::<T>(),
                Some(Producer::constructor::<T>()),
            )
            .await?;
        downcast(&instance)
    }

    /// Resolves `T`, constructing it through its async constructor if it is not bound
    pub async fn resolve_async<T: AsyncInject>(&self) -> Result<Arc<T>, ResolveError> {
        let instance = self
            .run(None, Key::of::<T>(), Some(Producer::async_constructor::<T>()))
            .await?;
        downcast(&instance)
    }

    pub async fn resolve_async_with<T: AsyncInject>(
        &self,
        overrides: &Registry,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self
            .run(
                Some(overrides),
                Key::of::<T>(),
                Some(Producer::async_constructor::<T>()),
            )
            .await?;
        downcast(&instance)
    }

    /// Resolves the binding of `T`, usually a trait object
    pub async fn resolve_dyn<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self.run(None, Key::of::<T>(), None).await?;
        downcast_dyn(&instance)
    }

    pub async fn resolve_dyn_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        overrides: &Registry,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self.run(Some(overrides), Key::of::<T>(), None).await?;
        downcast_dyn(&instance)
    }

    /// Resolves the binding registered under `name`
    pub async fn resolve_named<T: Injectable>(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self.run(None, Key::name(name), None).await?;
        downcast(&instance)
    }

    pub async fn resolve_named_with<T: Injectable>(
        &self,
        name: impl Into<Cow<'static, str>>,
        overrides: &Registry,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self.run(Some(overrides), Key::name(name), None).await?;
        downcast(&instance)
    }

    /// Resolves the binding for `key` without knowing its type
    pub async fn resolve_instance(&self, key: impl Into<Key>) -> Result<Instance, ResolveError> {
        self.run(None, key.into(), None).await
    }

    /// Invokes a producer which is not bound, resolving its dependencies
    ///
    /// The producer is scoped by [ResolverConfig::default_scope].
    pub async fn call<T: Injectable>(&self, producer: &Producer) -> Result<Arc<T>, ResolveError> {
        self.call_with(producer, &Registry::new()).await
    }

    pub async fn call_with<T: Injectable>(
        &self,
        producer: &Producer,
        overrides: &Registry,
    ) -> Result<Arc<T>, ResolveError> {
        let instance = self
            .run_request(Some(overrides), Request::Call(producer.clone()))
            .await?;
        downcast(&instance)
    }

    async fn run(
        &self,
        overrides: Option<&Registry>,
        key: Key,
        fallback: Option<Producer>,
    ) -> Result<Instance, ResolveError> {
        self.run_request(overrides, Request::Key { key, fallback }).await
    }

    /// Resolves `request` in a fresh frame until its singletons are published
    async fn run_request(
        &self,
        overrides: Option<&Registry>,
        request: Request,
    ) -> Result<Instance, ResolveError> {
        loop {
            let mut frame = Frame::new(&self.registry, overrides, &self.config)?;
            let target = frame.target(&request)?;
            let key = target.key.clone();
            tracing::trace!("Resolving {}", key);

            let instance = self.build(&mut frame, target).await?;
            if frame.publish() {
                return Ok(instance);
            }
            tracing::debug!(
                "Singletons for {} were published by another call, resolving again",
                key
            );
        }
    }

    /// Boxed, since it recurses through [AsyncResolver::build_uncached]
    fn build<'f, 'a>(
        &'f self,
        frame: &'f mut Frame<'a>,
        target: Target<'a>,
    ) -> BoxFuture<'f, Result<Instance, ResolveError>> {
        async move {
            if let Some(instance) = frame.begin(&target)? {
                return Ok(instance);
            }
            let result = self.build_uncached(frame, &target).await;
            frame.finish(&target);
            result
        }
        .boxed()
    }

    async fn build_uncached<'a>(
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
                let instance = self.build(frame, planned).await?;
                args.push(dependency.name, Slot::Resolved(instance));
            }
        }

        tracing::trace!("Invoking producer for {}", target.key);
        let produced = match target.producer.invoke(args) {
            Invocation::Ready(result) => result,
            Invocation::Pending(future) => future.await,
        };
        let instance = produced.map_err(|error| producer_failed(target, error))?;

        frame.store(target, instance.clone());

        for (slot, planned) in deferred {
            let filled = self.build(frame, planned).await?;
            slot.fill(filled);
        }

        Ok(instance)
    }
}
