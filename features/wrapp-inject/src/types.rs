use std::{
    any::{Any, TypeId},
    borrow::Cow,
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    sync::Arc,
};

/// Errors returned by producers
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// We assume resolvers may be shared between threads
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Type Name and Type Id
///
/// Equality and hashing only consider the [TypeId].
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}
impl Eq for TypeInfo {}
impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}
impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Identifies a dependency slot
///
/// Keys match by exact identity: a type key never matches a sub- or super-type,
/// a name key only matches the identical string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// The declared type of a dependency
    Type(TypeInfo),
    /// The declared name of a dependency
    Name(Cow<'static, str>),
}
impl Key {
    /// Type key for `T`, which may be unsized (e.g. `dyn Trait`)
    pub fn of<T: 'static + ?Sized>() -> Key {
        Key::Type(TypeInfo::of::<T>())
    }

    /// Name key
    pub fn name(name: impl Into<Cow<'static, str>>) -> Key {
        Key::Name(name.into())
    }

    pub fn is_name(&self) -> bool {
        matches!(self, Key::Name(_))
    }

    pub fn type_info(&self) -> Option<TypeInfo> {
        match self {
            Key::Type(info) => Some(*info),
            Key::Name(_) => None,
        }
    }
}
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type(info) => f.write_str(info.type_name),
            Key::Name(name) => write!(f, "\"{name}\""),
        }
    }
}
impl From<TypeInfo> for Key {
    fn from(info: TypeInfo) -> Self {
        Key::Type(info)
    }
}
impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Key::Name(Cow::Borrowed(name))
    }
}
impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(Cow::Owned(name))
    }
}

/// Instance of a Producer
///
/// Sized values are stored as `Arc<T>` directly, so downcasting hands out the very
/// same allocation. Unsized values (trait objects) are stored as `Arc<Arc<T>>`.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

impl Instance {
    pub(crate) fn new<T: Injectable>(instance: T) -> Self {
        Self::from_arc(Arc::new(instance))
    }

    pub(crate) fn from_arc<T: Injectable>(instance: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance,
        }
    }

    pub(crate) fn from_dyn<T: ?Sized + Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance: Arc::new(instance),
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    pub fn downcast_dyn<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, &'static str> {
        self.instance
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(self.info.type_name)
    }

    /// True if both handles point to the same object
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}
