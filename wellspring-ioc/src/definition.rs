//! Declarative descriptions of how beans are constructed and managed. A
//! [BeanDefinition] carries no behavior of its own - it is read by the
//! container, which drives construction through an
//! [InstantiationStrategy](crate::instantiation::InstantiationStrategy).

use crate::error::ContainerError;
use crate::instance::{BeanInstancePtr, BeanResolver, CastFunction, ErrorPtr, ManagedBean};
use derivative::Derivative;
use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

/// How long a bean instance lives.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum BeanScope {
    /// One shared instance per container lifetime, constructed at most once.
    #[default]
    Singleton,
    /// A fresh instance on every lookup, never cached or tracked afterwards.
    Prototype,
}

/// Classification of a definition. Informational only - preserved for
/// introspection, never consulted by the lifecycle.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum BeanRole {
    #[default]
    Application,
    Support,
    Infrastructure,
}

pub type BeanConstructor =
    Arc<dyn Fn(&mut dyn BeanResolver) -> Result<ManagedBean, ContainerError> + Send + Sync>;

pub type FactoryMethod = Arc<
    dyn Fn(&ManagedBean, &mut dyn BeanResolver) -> Result<ManagedBean, ContainerError>
        + Send
        + Sync,
>;

pub type LifecycleCallback = Arc<dyn Fn(&ManagedBean) -> Result<(), ErrorPtr> + Send + Sync>;

pub type PopulateCallback = Arc<
    dyn Fn(&ManagedBean, &mut dyn BeanResolver) -> Result<(), ContainerError> + Send + Sync,
>;

/// Construction strategy of a definition. The variants are mutually exclusive
/// by construction: a bean is built either directly or through a factory bean
/// registered elsewhere in the container.
#[derive(Clone)]
pub enum Instantiator {
    Constructor(BeanConstructor),
    Factory {
        factory_bean: String,
        factory_method: FactoryMethod,
    },
}

/// A single type satisfied by a bean, used for type-based lookup.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct TypeBinding {
    pub type_id: TypeId,
    pub type_name: &'static str,
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

impl TypeBinding {
    pub fn new(type_id: TypeId, type_name: &'static str, cast: CastFunction) -> Self {
        Self {
            type_id,
            type_name,
            cast,
        }
    }

    /// Binding for a concrete type, cast by plain downcasting.
    pub fn of<T: Send + Sync + 'static>() -> Self {
        Self::new(TypeId::of::<T>(), type_name::<T>(), concrete_cast::<T>)
    }
}

fn concrete_cast<T: Send + Sync + 'static>(
    instance: BeanInstancePtr,
) -> Result<Box<dyn Any>, BeanInstancePtr> {
    instance
        .downcast::<T>()
        .map(|typed| Box::new(typed) as Box<dyn Any>)
}

/// The declarative recipe for building one bean. Attributes which can be
/// inherited from a parent definition are optional so that merging can tell
/// unset apart from explicitly set.
#[derive(Derivative, Clone, Default)]
#[derivative(Debug)]
pub struct BeanDefinition {
    /// Name of another definition this one inherits unset attributes from.
    pub parent_name: Option<String>,
    #[derivative(Debug = "ignore")]
    pub instantiator: Option<Instantiator>,
    /// Optional second construction phase, run after instantiation with the
    /// instance already exposed to the container. The only legal vehicle for
    /// cycles between singletons; rejected on prototypes.
    #[derivative(Debug = "ignore")]
    pub populate: Option<PopulateCallback>,
    pub scope: Option<BeanScope>,
    pub lazy: Option<bool>,
    /// Beans which must be fully initialized before this one is constructed.
    pub depends_on: Vec<String>,
    pub autowire_candidate: Option<bool>,
    pub primary: Option<bool>,
    #[derivative(Debug = "ignore")]
    pub init_callback: Option<LifecycleCallback>,
    #[derivative(Debug = "ignore")]
    pub destroy_callback: Option<LifecycleCallback>,
    pub role: Option<BeanRole>,
    /// Abstract definitions are templates for inheritance and never reach the
    /// instantiation strategy.
    pub abstract_definition: bool,
    /// Types this bean satisfies for type-based lookup.
    pub bindings: Vec<TypeBinding>,
}

impl BeanDefinition {
    pub fn new() -> Self {
        Default::default()
    }

    /// Definition built from a plain constructor closure, bound to its concrete
    /// type.
    pub fn for_type<T, F>(constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut dyn BeanResolver) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        Self::new()
            .with_constructor(move |resolver| constructor(resolver).map(ManagedBean::from_value))
            .with_type::<T>()
    }

    pub fn with_constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&mut dyn BeanResolver) -> Result<ManagedBean, ContainerError> + Send + Sync + 'static,
    {
        self.instantiator = Some(Instantiator::Constructor(Arc::new(constructor)));
        self
    }

    pub fn with_factory<F>(mut self, factory_bean: impl Into<String>, factory_method: F) -> Self
    where
        F: Fn(&ManagedBean, &mut dyn BeanResolver) -> Result<ManagedBean, ContainerError>
            + Send
            + Sync
            + 'static,
    {
        self.instantiator = Some(Instantiator::Factory {
            factory_bean: factory_bean.into(),
            factory_method: Arc::new(factory_method),
        });
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_name = Some(parent.into());
        self
    }

    pub fn with_scope(mut self, scope: BeanScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = Some(lazy);
        self
    }

    pub fn with_depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_autowire_candidate(mut self, candidate: bool) -> Self {
        self.autowire_candidate = Some(candidate);
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = Some(primary);
        self
    }

    pub fn with_init<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ManagedBean) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    {
        self.init_callback = Some(Arc::new(callback));
        self
    }

    pub fn with_destroy<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ManagedBean) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    {
        self.destroy_callback = Some(Arc::new(callback));
        self
    }

    pub fn with_populate<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ManagedBean, &mut dyn BeanResolver) -> Result<(), ContainerError>
            + Send
            + Sync
            + 'static,
    {
        self.populate = Some(Arc::new(callback));
        self
    }

    pub fn with_role(mut self, role: BeanRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn as_abstract(mut self) -> Self {
        self.abstract_definition = true;
        self
    }

    /// Adds a binding for the concrete type `T`.
    pub fn with_type<T: Send + Sync + 'static>(mut self) -> Self {
        self.bindings.push(TypeBinding::of::<T>());
        self
    }

    /// Adds an explicit binding, typically for a `dyn Trait` this bean
    /// satisfies, with a caller-supplied cast.
    pub fn with_binding(mut self, binding: TypeBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn scope_or_default(&self) -> BeanScope {
        self.scope.unwrap_or_default()
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy.unwrap_or(false)
    }

    pub fn is_primary(&self) -> bool {
        self.primary.unwrap_or(false)
    }

    pub fn is_autowire_candidate(&self) -> bool {
        self.autowire_candidate.unwrap_or(true)
    }

    pub fn role_or_default(&self) -> BeanRole {
        self.role.unwrap_or_default()
    }

    pub fn binding_for(&self, type_id: TypeId) -> Option<&TypeBinding> {
        self.bindings
            .iter()
            .find(|binding| binding.type_id == type_id)
    }
}
