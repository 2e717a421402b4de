//! String-keyed dependency injection container.
//!
//! Services are registered as [`Definition`]s under string ids, wired together
//! with `@id` service references and `%name%` parameter references, and built
//! lazily on first [`Container::get`]. Compiler passes may rewrite definitions
//! before the container freezes.

pub mod builder;
pub mod config;
pub mod container;
pub mod error;
pub mod logging;

// Re-export commonly used items for convenience
pub use builder::ContainerBuilder;
pub use config::ContainerConfig;
pub use container::{
    downcast, Argument, Arguments, CompilerPass, Container, ContainerStats, Definition, Factory,
    FactoryRegistry, FactorySource, Instance, MethodCall, Service, SharedContainer, Tags,
};
pub use error::{ConfigError, ContainerError, Result, ServiceError};
