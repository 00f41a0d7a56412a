use std::future::Future;

use crate::{
    arguments::Arguments,
    producer::Producer,
    types::{DynError, Injectable, Key, TypeInfo},
};

/// Information about a producer dependency
///
/// A producer lists its dependencies in the order it wants them resolved.
/// Bindings are looked up by `name` first, then by `type_info`.
#[derive(Debug, Clone)]
pub struct DependencyInfo {
    /// The declared name
    pub name: &'static str,
    /// The declared type, if any
    pub type_info: Option<TypeInfo>,
    /// If it has a default and may be skipped
    pub optional: bool,
    /// If it is injected after construction through a [crate::Lazy]
    pub lazy: bool,
    /// Builds the declared type when nothing is bound for it
    fallback: Option<fn() -> Producer>,
}

impl DependencyInfo {
    /// A dependency on `T` which is constructed implicitly when not bound
    pub fn of<T: Inject>(name: &'static str) -> Self {
        DependencyInfo {
            fallback: Some(Producer::constructor::<T>),
            ..Self::typed::<T>(name)
        }
    }

    /// A dependency on `T` which is constructed implicitly through its async constructor
    pub fn of_async<T: AsyncInject>(name: &'static str) -> Self {
        DependencyInfo {
            fallback: Some(Producer::async_constructor::<T>),
            ..Self::typed::<T>(name)
        }
    }

    /// A dependency on `T` which must be bound, either by name or by type
    pub fn typed<T: 'static + ?Sized>(name: &'static str) -> Self {
        DependencyInfo {
            name,
            type_info: Some(TypeInfo::of::<T>()),
            optional: false,
            lazy: false,
            fallback: None,
        }
    }

    /// A dependency without a declared type, only name bindings apply
    pub fn named(name: &'static str) -> Self {
        DependencyInfo {
            name,
            type_info: None,
            optional: false,
            lazy: false,
            fallback: None,
        }
    }

    /// Marks the dependency as having a default
    pub fn optional(self) -> Self {
        DependencyInfo {
            optional: true,
            ..self
        }
    }

    /// Marks the dependency as injected after construction
    pub fn lazy(self) -> Self {
        DependencyInfo { lazy: true, ..self }
    }

    pub fn name_key(&self) -> Key {
        Key::from(self.name)
    }

    pub fn type_key(&self) -> Option<Key> {
        self.type_info.map(Key::Type)
    }

    /// The key reported when this dependency can not be resolved
    pub(crate) fn reported_key(&self) -> Key {
        self.type_key().unwrap_or_else(|| self.name_key())
    }

    /// The implicit producer for the declared type
    pub fn fallback(&self) -> Option<Producer> {
        self.fallback.map(|make| make())
    }
}

/// A type the resolver can construct from its declared dependencies
///
/// ```
/// use std::sync::Arc;
/// use wrapp_inject::{Arguments, DependencyInfo, DynError, Inject};
///
/// struct Engine;
/// impl Inject for Engine {
///     fn construct(_: &mut Arguments) -> Result<Self, DynError> {
///         Ok(Engine)
///     }
/// }
///
/// struct Car {
///     engine: Arc<Engine>,
/// }
/// impl Inject for Car {
///     fn dependencies() -> Vec<DependencyInfo> {
///         vec![DependencyInfo::of::<Engine>("engine")]
///     }
///
///     fn construct(args: &mut Arguments) -> Result<Self, DynError> {
///         Ok(Car {
///             engine: args.get("engine")?,
///         })
///     }
/// }
/// ```
pub trait Inject: Injectable + Sized {
    /// Returns a list of dependencies required to construct `Self`
    fn dependencies() -> Vec<DependencyInfo> {
        Vec::new()
    }

    /// Constructs a new instance from the resolved dependencies
    fn construct(args: &mut Arguments) -> Result<Self, DynError>;
}

/// Like [Inject], with a constructor that may suspend
///
/// Only the [crate::AsyncResolver] can construct these.
pub trait AsyncInject: Injectable + Sized {
    /// Returns a list of dependencies required to construct `Self`
    fn dependencies() -> Vec<DependencyInfo> {
        Vec::new()
    }

    /// Constructs a new instance from the resolved dependencies
    fn construct(args: Arguments) -> impl Future<Output = Result<Self, DynError>> + Send + 'static;
}
