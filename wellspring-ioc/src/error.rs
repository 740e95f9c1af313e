use crate::instance::ErrorPtr;
use thiserror::Error;

/// Errors related to registering and merging bean definitions.
#[derive(Error, Clone, Debug)]
pub enum BeanDefinitionRegistryError {
    #[error("a definition named '{0}' is already registered")]
    DuplicateDefinition(String),
    #[error("no definition registered under the name '{0}'")]
    NoSuchDefinition(String),
    #[error("definition '{child}' inherits from '{parent}', which itself names a parent - only single-level inheritance is supported")]
    NestedDefinitionInheritance { child: String, parent: String },
}

/// Errors surfaced by container resolution, refresh and typed lookup. All are
/// terminal for the resolution which raised them - retrying with identical
/// inputs deterministically fails again.
#[derive(Error, Clone, Debug)]
pub enum ContainerError {
    #[error(transparent)]
    Registry(#[from] BeanDefinitionRegistryError),
    #[error("definition '{name}' cannot be instantiated: {reason}")]
    InvalidDefinition { name: String, reason: String },
    #[error("circular dependency: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
    #[error("expected exactly one candidate for {requested}, found: [{}]", .candidates.join(", "))]
    AmbiguousResolution {
        requested: String,
        candidates: Vec<String>,
    },
    #[error("post-processing of bean '{name}' failed: {cause}")]
    PostProcessing { name: String, cause: ErrorPtr },
    #[error("creating bean '{name}' failed: {cause}")]
    BeanCreation { name: String, cause: ErrorPtr },
    #[error("bean '{0}' already failed to initialize in this refresh cycle")]
    AlreadyFailed(String),
    #[error("the container is closed and no longer resolves beans")]
    ContainerClosed,
    #[error("bean '{name}' is not of the requested type {requested}")]
    IncompatibleBean { name: String, requested: String },
}
