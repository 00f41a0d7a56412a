//! Dependency resolution for Rust applications
//!
//! Types describe what they need through [Inject] (or [AsyncInject]), producers are bound
//! to keys in a [Registry] together with a [Scope], and a [Resolver] (or [AsyncResolver])
//! builds the requested value by recursively resolving its dependencies.
//!
//! ```
//! use std::sync::Arc;
//! use wrapp_inject::{Arguments, DependencyInfo, DynError, Inject, Producer, Registry, Resolver};
//!
//! struct Driver {
//!     name: Arc<String>,
//! }
//! impl Inject for Driver {
//!     fn dependencies() -> Vec<DependencyInfo> {
//!         vec![DependencyInfo::typed::<String>("driver_name")]
//!     }
//!
//!     fn construct(args: &mut Arguments) -> Result<Self, DynError> {
//!         Ok(Driver {
//!             name: args.get("driver_name")?,
//!         })
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry
//!     .local("driver_name", Producer::value("Fernando".to_string()))
//!     .unwrap();
//!
//! let driver = Resolver::new(registry).resolve::<Driver>().unwrap();
//! assert_eq!(driver.name.as_str(), "Fernando");
//! ```

mod arguments;
mod cache;
mod dependency;
mod dependency_graph;
mod errors;
mod lazy;
mod producer;
mod registry;
mod resolver;
mod scope;
mod types;

pub use arguments::Arguments;
pub use cache::SingletonCache;
pub use dependency::{AsyncInject, DependencyInfo, Inject};
pub use dependency_graph::{DependencyGraph, DependencyGraphError, DependencyGraphErrors};
pub use errors::{BindError, ParseScopeError, ResolveError};
pub use lazy::Lazy;
pub use producer::{Producer, ProducerId};
pub use registry::{Binding, Registry};
pub use resolver::{async_resolver::AsyncResolver, sync_resolver::Resolver, ResolverConfig};
pub use scope::Scope;
pub use types::{DynError, Injectable, Instance, Key, TypeInfo};
