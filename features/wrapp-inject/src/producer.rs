use std::{
    any::{type_name, TypeId},
    fmt::Debug,
    future::Future,
    marker::PhantomData,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    arguments::Arguments,
    dependency::{AsyncInject, DependencyInfo, Inject},
    errors::ResolveError,
    types::{DynError, Injectable, Instance, TypeInfo},
};

/// Identity of a producer, the key of every scope cache
///
/// Constructors are identified by the type they construct, every other producer
/// gets a fresh identity on creation which its clones share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProducerId {
    Type(TypeId),
    Unique(u64),
}
impl ProducerId {
    fn unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        ProducerId::Unique(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Result of invoking a producer
pub(crate) enum Invocation {
    Ready(Result<Instance, DynError>),
    Pending(BoxFuture<'static, Result<Instance, DynError>>),
}

/// Wrapper Trait for producers, providing instances of Any
pub(crate) trait DynProducer: Send + Sync {
    fn supplies(&self) -> TypeInfo;

    /// Returns a list of dependencies for the producer
    fn dependencies(&self) -> Vec<DependencyInfo> {
        Vec::new()
    }

    /// Invokes the producer with its resolved dependencies
    fn invoke(&self, args: Arguments) -> Invocation;
}

/// Unit of construction
///
/// Producers are cheap to clone; clones share the same [ProducerId].
#[derive(Clone)]
pub struct Producer {
    id: ProducerId,
    inner: Arc<dyn DynProducer>,
}
impl Debug for Producer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("id", &self.id)
            .field("supplies", &self.inner.supplies().type_name)
            .finish()
    }
}

impl Producer {
    fn new(id: ProducerId, inner: impl DynProducer + 'static) -> Self {
        Producer {
            id,
            inner: Arc::new(inner),
        }
    }

    /// Constructs `T` through [Inject]
    pub fn constructor<T: Inject>() -> Self {
        Self::new(
            ProducerId::Type(TypeId::of::<T>()),
            Constructor::<T>(PhantomData),
        )
    }

    /// Constructs `T` through [AsyncInject]
    pub fn async_constructor<T: AsyncInject>() -> Self {
        Self::new(
            ProducerId::Type(TypeId::of::<T>()),
            AsyncConstructor::<T>(PhantomData),
        )
    }

    /// A function invoked with the resolved `dependencies`
    pub fn function<T, F>(dependencies: Vec<DependencyInfo>, function: F) -> Self
    where
        T: Injectable,
        F: Fn(&mut Arguments) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Self::new(
            ProducerId::unique(),
            Function {
                dependencies,
                function,
                _marker: PhantomData::<fn() -> T>,
            },
        )
    }

    /// An async function invoked with the resolved `dependencies`
    pub fn async_function<T, F, Fut>(dependencies: Vec<DependencyInfo>, function: F) -> Self
    where
        T: Injectable,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, DynError>> + Send + 'static,
    {
        Self::new(
            ProducerId::unique(),
            AsyncFunction {
                dependencies,
                function,
                _marker: PhantomData::<fn() -> T>,
            },
        )
    }

    /// A zero-argument factory, its result is used as is
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Injectable,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::function(Vec::new(), move |_| Ok(factory()))
    }

    /// A zero-argument async factory, its result is used as is
    pub fn async_factory<T, F, Fut>(factory: F) -> Self
    where
        T: Injectable,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::async_function(Vec::new(), move |_| factory().map(Ok))
    }

    /// An existing value
    ///
    /// Every invocation hands out the same value, whatever the scope.
    pub fn value<T: Injectable>(value: T) -> Self {
        Self::new(ProducerId::unique(), Value(Instance::new(value)))
    }

    /// Exposes what this producer supplies as the trait object `U`
    ///
    /// ```
    /// use std::sync::Arc;
    /// use wrapp_inject::{Arguments, DynError, Inject, Producer};
    ///
    /// trait Storage: Send + Sync {}
    /// struct Memory;
    /// impl Storage for Memory {}
    /// impl Inject for Memory {
    ///     fn construct(_: &mut Arguments) -> Result<Self, DynError> {
    ///         Ok(Memory)
    ///     }
    /// }
    ///
    /// let storage = Producer::constructor::<Memory>()
    ///     .upcast(|memory: Arc<Memory>| -> Arc<dyn Storage> { memory });
    /// ```
    pub fn upcast<T, U, F>(self, cast: F) -> Self
    where
        T: Injectable,
        U: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
    {
        Self::new(
            ProducerId::unique(),
            Upcast {
                inner: self,
                cast: Arc::new(cast),
                _marker: PhantomData::<fn(Arc<T>) -> Arc<U>>,
            },
        )
    }

    pub fn id(&self) -> ProducerId {
        self.id
    }

    /// The type this producer supplies
    pub fn supplies(&self) -> TypeInfo {
        self.inner.supplies()
    }

    /// The dependencies to resolve before invoking this producer
    pub fn dependencies(&self) -> Vec<DependencyInfo> {
        self.inner.dependencies()
    }

    pub(crate) fn invoke(&self, args: Arguments) -> Invocation {
        self.inner.invoke(args)
    }
}

struct Constructor<T>(PhantomData<fn() -> T>);
impl<T: Inject> DynProducer for Constructor<T> {
    fn supplies(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn dependencies(&self) -> Vec<DependencyInfo> {
        T::dependencies()
    }

    fn invoke(&self, mut args: Arguments) -> Invocation {
        Invocation::Ready(T::construct(&mut args).map(Instance::new))
    }
}

struct AsyncConstructor<T>(PhantomData<fn() -> T>);
impl<T: AsyncInject> DynProducer for AsyncConstructor<T> {
    fn supplies(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn dependencies(&self) -> Vec<DependencyInfo> {
        T::dependencies()
    }

    fn invoke(&self, args: Arguments) -> Invocation {
        Invocation::Pending(T::construct(args).map(|result| result.map(Instance::new)).boxed())
    }
}

struct Function<T, F> {
    dependencies: Vec<DependencyInfo>,
    function: F,
    _marker: PhantomData<fn() -> T>,
}
impl<T, F> DynProducer for Function<T, F>
where
    T: Injectable,
    F: Fn(&mut Arguments) -> Result<T, DynError> + Send + Sync,
{
    fn supplies(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn dependencies(&self) -> Vec<DependencyInfo> {
        self.dependencies.clone()
    }

    fn invoke(&self, mut args: Arguments) -> Invocation {
        Invocation::Ready((self.function)(&mut args).map(Instance::new))
    }
}

struct AsyncFunction<T, F> {
    dependencies: Vec<DependencyInfo>,
    function: F,
    _marker: PhantomData<fn() -> T>,
}
impl<T, F, Fut> DynProducer for AsyncFunction<T, F>
where
    T: Injectable,
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, DynError>> + Send + 'static,
{
    fn supplies(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    fn dependencies(&self) -> Vec<DependencyInfo> {
        self.dependencies.clone()
    }

    fn invoke(&self, args: Arguments) -> Invocation {
        Invocation::Pending(
            (self.function)(args)
                .map(|result| result.map(Instance::new))
                .boxed(),
        )
    }
}

struct Value(Instance);
impl DynProducer for Value {
    fn supplies(&self) -> TypeInfo {
        self.0.info
    }

    fn invoke(&self, _: Arguments) -> Invocation {
        Invocation::Ready(Ok(self.0.clone()))
    }
}

struct Upcast<T, U: ?Sized, F> {
    inner: Producer,
    cast: Arc<F>,
    _marker: PhantomData<fn(Arc<T>) -> Arc<U>>,
}
impl<T, U, F> DynProducer for Upcast<T, U, F>
where
    T: Injectable,
    U: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
{
    fn supplies(&self) -> TypeInfo {
        TypeInfo::of::<U>()
    }

    fn dependencies(&self) -> Vec<DependencyInfo> {
        self.inner.dependencies()
    }

    fn invoke(&self, args: Arguments) -> Invocation {
        match self.inner.invoke(args) {
            Invocation::Ready(result) => Invocation::Ready(
                result.and_then(|instance| cast_instance::<T, U, F>(&*self.cast, instance)),
            ),
            Invocation::Pending(future) => {
                let cast = self.cast.clone();
                Invocation::Pending(
                    future
                        .map(move |result| {
                            result.and_then(|instance| cast_instance::<T, U, F>(&*cast, instance))
                        })
                        .boxed(),
                )
            }
        }
    }
}

fn cast_instance<T, U, F>(cast: &F, instance: Instance) -> Result<Instance, DynError>
where
    T: Injectable,
    U: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<T>) -> Arc<U>,
{
    let concrete = instance
        .downcast::<T>()
        .map_err(|actual_type| ResolveError::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type,
        })?;
    Ok(Instance::from_dyn(cast(concrete)))
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    struct Leaf;
    impl Inject for Leaf {
        fn construct(_: &mut Arguments) -> Result<Self, DynError> {
            Ok(Leaf)
        }
    }

    trait Named: Send + Sync {
        fn name(&self) -> &'static str;
    }
    impl Named for Leaf {
        fn name(&self) -> &'static str {
            "leaf"
        }
    }

    fn ready(invocation: Invocation) -> Instance {
        match invocation {
            Invocation::Ready(result) => result.unwrap(),
            Invocation::Pending(_) => panic!("expected a ready invocation"),
        }
    }

    #[test]
    fn constructor_identity_is_the_type() {
        assert_eq!(
            Producer::constructor::<Leaf>().id(),
            Producer::constructor::<Leaf>().id()
        );
        assert_eq!(
            Producer::constructor::<Leaf>().id(),
            ProducerId::Type(TypeId::of::<Leaf>())
        );
    }

    #[test]
    fn closures_get_fresh_identities() {
        let first = Producer::factory(|| 1u8);
        let second = Producer::factory(|| 1u8);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.id(), first.clone().id());
    }

    #[test]
    fn value_hands_out_the_same_instance() {
        let producer = Producer::value(String::from("shared"));
        let a = ready(producer.invoke(Arguments::default()));
        let b = ready(producer.invoke(Arguments::default()));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn factory_is_invoked_every_time() {
        let producer = Producer::factory(|| String::from("fresh"));
        let a = ready(producer.invoke(Arguments::default()));
        let b = ready(producer.invoke(Arguments::default()));
        assert!(!a.ptr_eq(&b));
        assert!(producer.dependencies().is_empty());
    }

    #[test]
    fn async_factory_is_pending() {
        let producer = Producer::async_factory(|| async { 5u32 });
        let Invocation::Pending(future) = producer.invoke(Arguments::default()) else {
            panic!("expected a pending invocation");
        };
        let instance = block_on(future).unwrap();
        assert_eq!(*instance.downcast::<u32>().unwrap(), 5);
    }

    #[test]
    fn upcast_supplies_the_trait_object() {
        let producer =
            Producer::constructor::<Leaf>().upcast(|leaf: Arc<Leaf>| -> Arc<dyn Named> { leaf });
        assert_eq!(producer.supplies(), TypeInfo::of::<dyn Named>());
        assert_ne!(producer.id(), Producer::constructor::<Leaf>().id());

        let instance = ready(producer.invoke(Arguments::default()));
        assert_eq!(instance.downcast_dyn::<dyn Named>().unwrap().name(), "leaf");
    }
}
