//! Type-erased bean instances, the live-bean record, and the resolution
//! interface available to code running inside the container pipeline.

use crate::error::ContainerError;
use crate::reflect::Invocable;
use std::any::{type_name, Any, TypeId};
use std::error::Error;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub type BeanInstancePtr = Arc<dyn Any + Send + Sync>;

pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Cast function associated with a type binding of a bean definition. Takes an
/// erased instance and produces a `Box` containing `Arc<T>` for the bound type,
/// or gives the instance back on mismatch. Used to hand out strongly-typed
/// pointers, including `Arc<dyn Trait>` ones, which cannot be obtained by plain
/// downcasting.
pub type CastFunction = fn(BeanInstancePtr) -> Result<Box<dyn Any>, BeanInstancePtr>;

/// A live, container-managed instance. Next to the erased instance pointer, the
/// record optionally carries the bean's [Invocable] view, which is the surface
/// interception proxies operate over.
#[derive(Clone)]
pub struct ManagedBean {
    instance: BeanInstancePtr,
    invocable: Option<Arc<dyn Invocable>>,
}

impl ManagedBean {
    pub fn new(instance: BeanInstancePtr) -> Self {
        Self {
            instance,
            invocable: None,
        }
    }

    /// Wraps a plain value, without an invocable view.
    pub fn from_value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::new(Arc::new(value))
    }

    /// Wraps an instance exposing a capability surface. The erased pointer and
    /// the invocable view refer to the same allocation.
    pub fn from_invocable<T: Invocable + 'static>(instance: Arc<T>) -> Self {
        Self {
            invocable: Some(instance.clone() as Arc<dyn Invocable>),
            instance: instance as BeanInstancePtr,
        }
    }

    pub fn with_invocable(instance: BeanInstancePtr, invocable: Arc<dyn Invocable>) -> Self {
        Self {
            instance,
            invocable: Some(invocable),
        }
    }

    pub fn instance(&self) -> &BeanInstancePtr {
        &self.instance
    }

    pub fn invocable(&self) -> Option<&Arc<dyn Invocable>> {
        self.invocable.as_ref()
    }

    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instance.clone().downcast::<T>().ok()
    }

    /// Whether both records point at the same live instance.
    pub fn is_same_instance(&self, other: &ManagedBean) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl Debug for ManagedBean {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedBean")
            .field("type_id", &self.instance.as_ref().type_id())
            .field("has_invocable", &self.invocable.is_some())
            .finish()
    }
}

/// Resolution interface handed to constructors, factory methods and populate
/// callbacks while the container is building a bean. Resolutions made through
/// it take part in cycle detection for the current resolution path.
pub trait BeanResolver {
    fn resolve_named(&mut self, name: &str) -> Result<ManagedBean, ContainerError>;

    fn resolve_primary(&mut self, type_id: TypeId) -> Result<ManagedBean, ContainerError>;
}

/// Strongly-typed helpers over [BeanResolver].
pub trait TypedBeanResolver {
    /// Resolves a named bean and downcasts it to its concrete type.
    fn resolve_typed<T: Send + Sync + 'static>(
        &mut self,
        name: &str,
    ) -> Result<Arc<T>, ContainerError>;
}

impl<R: BeanResolver + ?Sized> TypedBeanResolver for R {
    fn resolve_typed<T: Send + Sync + 'static>(
        &mut self,
        name: &str,
    ) -> Result<Arc<T>, ContainerError> {
        let bean = self.resolve_named(name)?;
        bean.downcast::<T>()
            .ok_or_else(|| ContainerError::IncompatibleBean {
                name: name.to_string(),
                requested: type_name::<T>().to_string(),
            })
    }
}
