//! The composition root: resolves definitions in dependency order, drives the
//! instantiation strategy and the post-processor chain, and owns the live-bean
//! cache together with all lifecycle state transitions.

use crate::definition::{BeanDefinition, BeanScope};
use crate::error::ContainerError;
use crate::instance::{BeanResolver, CastFunction, ManagedBean};
use crate::instantiation::{InstantiationStrategy, SupplierInstantiationStrategy};
use crate::post_processor::{BeanPostProcessor, PostProcessorChain};
use crate::registry::BeanDefinitionRegistry;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::any::{type_name, TypeId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Lifecycle state of a container-managed singleton.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum BeanStatus {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    /// Terminal for the current refresh cycle - the bean is not retried.
    Failed,
    Destroyed,
}

fn guard<G>(result: Result<G, PoisonError<G>>) -> G {
    result.unwrap_or_else(PoisonError::into_inner)
}

/// Names on the active resolution path, used to detect constructor cycles.
#[derive(Default)]
struct ResolutionPath(Vec<String>);

impl ResolutionPath {
    fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|entry| entry == name)
    }

    fn push(&mut self, name: &str) {
        self.0.push(name.to_string());
    }

    fn pop(&mut self) {
        self.0.pop();
    }

    fn cycle(&self, name: &str) -> Vec<String> {
        self.0
            .iter()
            .cloned()
            .chain([name.to_string()])
            .collect()
    }
}

struct ContainerResolver<'a> {
    container: &'a BeanContainer,
    path: &'a mut ResolutionPath,
}

impl BeanResolver for ContainerResolver<'_> {
    fn resolve_named(&mut self, name: &str) -> Result<ManagedBean, ContainerError> {
        self.container.resolve(name, self.path)
    }

    fn resolve_primary(&mut self, type_id: TypeId) -> Result<ManagedBean, ContainerError> {
        self.container
            .resolve_primary_entry(type_id, &format!("{type_id:?}"), self.path)
            .map(|(_, bean, _)| bean)
    }
}

/// Builder for [BeanContainer]. Consumes the definition registry, which makes
/// it immutable for the container's whole lifetime.
pub struct ContainerBuilder {
    registry: Box<dyn BeanDefinitionRegistry>,
    strategy: Box<dyn InstantiationStrategy>,
    chain: PostProcessorChain,
}

impl ContainerBuilder {
    pub fn new(registry: impl BeanDefinitionRegistry + 'static) -> Self {
        Self {
            registry: Box::new(registry),
            strategy: Box::new(SupplierInstantiationStrategy),
            chain: PostProcessorChain::new(),
        }
    }

    pub fn with_instantiation_strategy(
        mut self,
        strategy: impl InstantiationStrategy + 'static,
    ) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    /// Appends a post-processor; hooks run in registration order.
    pub fn with_post_processor(mut self, processor: impl BeanPostProcessor + 'static) -> Self {
        self.chain.push(Arc::new(processor));
        self
    }

    pub fn build(self) -> BeanContainer {
        BeanContainer {
            registry: self.registry,
            strategy: self.strategy,
            chain: self.chain,
            singletons: Default::default(),
            early_singletons: Default::default(),
            statuses: Default::default(),
            construction_order: Default::default(),
            construction_locks: Default::default(),
            closed: AtomicBool::new(false),
        }
    }
}

/// An inversion-of-control container over a fixed set of bean definitions.
///
/// Each container owns its live-bean cache and is independently constructible
/// and disposable - there is no process-wide state. [BeanContainer::close]
/// should be called once resolution traffic has stopped; it quiesces the
/// container before destroying singletons.
pub struct BeanContainer {
    registry: Box<dyn BeanDefinitionRegistry>,
    strategy: Box<dyn InstantiationStrategy>,
    chain: PostProcessorChain,
    singletons: RwLock<FxHashMap<String, ManagedBean>>,
    /// Singletons exposed mid-construction to break populate-phase cycles.
    early_singletons: RwLock<FxHashMap<String, ManagedBean>>,
    statuses: RwLock<FxHashMap<String, BeanStatus>>,
    construction_order: Mutex<Vec<String>>,
    construction_locks: Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
    closed: AtomicBool,
}

impl BeanContainer {
    /// Returns the bean registered under `name`, constructing it and its
    /// dependencies first when needed.
    pub fn get_bean(&self, name: &str) -> Result<ManagedBean, ContainerError> {
        self.ensure_open()?;
        let mut path = ResolutionPath::default();
        self.resolve(name, &mut path)
    }

    /// [BeanContainer::get_bean] downcast to the bean's concrete type.
    pub fn get_bean_typed<T: Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<T>, ContainerError> {
        self.get_bean(name)?
            .downcast::<T>()
            .ok_or_else(|| ContainerError::IncompatibleBean {
                name: name.to_string(),
                requested: type_name::<T>().to_string(),
            })
    }

    /// Returns the single bean satisfying `T`. With multiple candidates the
    /// one marked primary wins; zero candidates or an unresolved tie fails
    /// with [ContainerError::AmbiguousResolution].
    pub fn get_bean_of<T: ?Sized + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        self.ensure_open()?;
        let mut path = ResolutionPath::default();
        let (name, bean, cast) =
            self.resolve_primary_entry(TypeId::of::<T>(), type_name::<T>(), &mut path)?;
        cast_into::<T>(&name, &bean, cast)
    }

    /// Returns all beans satisfying `T`, in definition registration order.
    pub fn beans_of_type<T: ?Sized + 'static>(&self) -> Result<Vec<Arc<T>>, ContainerError> {
        self.ensure_open()?;
        let type_id = TypeId::of::<T>();

        self.registry
            .names_of_type(type_id)
            .into_iter()
            .map(|name| {
                let definition = self.registry.merged_definition(&name)?;
                if definition.abstract_definition {
                    return Ok(None);
                }

                let cast = self.binding_cast(&name, &definition, type_id)?;
                let mut path = ResolutionPath::default();
                let bean = self.resolve(&name, &mut path)?;

                cast_into::<T>(&name, &bean, cast).map(Some)
            })
            .filter_map(|result| result.transpose())
            .try_collect()
    }

    /// Eagerly constructs every concrete, non-lazy singleton. Fail-fast: the
    /// first failure destroys the already constructed singletons and aborts
    /// the refresh, so the container is never left half-initialized.
    pub fn refresh(&self) -> Result<(), ContainerError> {
        self.ensure_open()?;
        info!("refreshing container, eagerly constructing non-lazy singletons");

        for name in self.registry.names() {
            let definition = self.registry.merged_definition(&name)?;
            if definition.abstract_definition
                || definition.scope_or_default() != BeanScope::Singleton
                || definition.is_lazy()
            {
                continue;
            }

            let mut path = ResolutionPath::default();
            if let Err(error) = self.resolve(&name, &mut path) {
                warn!(bean = %name, %error, "refresh failed, destroying constructed singletons");
                self.destroy_singletons();
                return Err(error);
            }
        }

        Ok(())
    }

    /// Stops accepting resolutions and destroys singletons in reverse
    /// construction order. Destroy callbacks of prototype beans are never
    /// invoked - the container does not track prototype instances.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("closing container");
        self.destroy_singletons();
    }

    /// Lifecycle state of a singleton; [BeanStatus::Uninitialized] for unknown
    /// or not yet requested names.
    pub fn bean_status(&self, name: &str) -> BeanStatus {
        guard(self.statuses.read())
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    /// Raw registered definition, e.g. for role introspection.
    pub fn definition(&self, name: &str) -> Option<&BeanDefinition> {
        self.registry.definition(name)
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    fn ensure_open(&self) -> Result<(), ContainerError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ContainerError::ContainerClosed)
        } else {
            Ok(())
        }
    }

    fn resolve(&self, name: &str, path: &mut ResolutionPath) -> Result<ManagedBean, ContainerError> {
        if let Some(bean) = guard(self.singletons.read()).get(name) {
            return Ok(bean.clone());
        }

        // a singleton allocated but not yet initialized; visible only to
        // populate-phase back-references
        if let Some(bean) = guard(self.early_singletons.read()).get(name) {
            return Ok(bean.clone());
        }

        if path.contains(name) {
            return Err(ContainerError::CircularDependency(path.cycle(name)));
        }

        let definition = self.registry.merged_definition(name)?;
        self.validate(name, &definition)?;

        match definition.scope_or_default() {
            BeanScope::Singleton => self.resolve_singleton(name, &definition, path),
            BeanScope::Prototype => self.construct(name, &definition, path),
        }
    }

    fn resolve_singleton(
        &self,
        name: &str,
        definition: &BeanDefinition,
        path: &mut ResolutionPath,
    ) -> Result<ManagedBean, ContainerError> {
        let lock = self.construction_lock(name);
        let _construction = guard(lock.lock());

        // the singleton may have been constructed while waiting for the lock
        if let Some(bean) = guard(self.singletons.read()).get(name) {
            return Ok(bean.clone());
        }

        if self.bean_status(name) == BeanStatus::Failed {
            return Err(ContainerError::AlreadyFailed(name.to_string()));
        }

        let bean = self.construct(name, definition, path).map_err(|error| {
            self.set_status(name, BeanStatus::Failed);
            error
        })?;

        guard(self.singletons.write()).insert(name.to_string(), bean.clone());
        guard(self.early_singletons.write()).remove(name);
        guard(self.construction_order.lock()).push(name.to_string());
        self.set_status(name, BeanStatus::Ready);
        debug!(bean = name, "singleton ready");

        Ok(bean)
    }

    fn construct(
        &self,
        name: &str,
        definition: &BeanDefinition,
        path: &mut ResolutionPath,
    ) -> Result<ManagedBean, ContainerError> {
        let singleton = definition.scope_or_default() == BeanScope::Singleton;
        if singleton {
            self.set_status(name, BeanStatus::Initializing);
        }

        path.push(name);
        let result = self.run_pipeline(name, definition, singleton, path);
        path.pop();

        if result.is_err() {
            guard(self.early_singletons.write()).remove(name);
        }

        result
    }

    fn run_pipeline(
        &self,
        name: &str,
        definition: &BeanDefinition,
        singleton: bool,
        path: &mut ResolutionPath,
    ) -> Result<ManagedBean, ContainerError> {
        for dependency in &definition.depends_on {
            self.resolve(dependency, path)?;
        }

        let raw = {
            let mut resolver = ContainerResolver {
                container: self,
                path: &mut *path,
            };
            self.strategy.instantiate(name, definition, &mut resolver)?
        };

        if singleton {
            guard(self.early_singletons.write()).insert(name.to_string(), raw.clone());
        }

        if let Some(populate) = &definition.populate {
            let mut resolver = ContainerResolver {
                container: self,
                path: &mut *path,
            };
            populate.as_ref()(&raw, &mut resolver)?;
        }

        let bean = self.chain.run_before(raw, name)?;

        if let Some(init) = &definition.init_callback {
            init.as_ref()(&bean).map_err(|cause| ContainerError::BeanCreation {
                name: name.to_string(),
                cause,
            })?;
        }

        self.chain.run_after(bean, name)
    }

    fn validate(&self, name: &str, definition: &BeanDefinition) -> Result<(), ContainerError> {
        if definition.abstract_definition {
            return Err(ContainerError::InvalidDefinition {
                name: name.to_string(),
                reason: "abstract definitions are templates and cannot be instantiated"
                    .to_string(),
            });
        }

        if definition.populate.is_some()
            && definition.scope_or_default() == BeanScope::Prototype
        {
            return Err(ContainerError::InvalidDefinition {
                name: name.to_string(),
                reason: "two-phase population is only supported for singletons".to_string(),
            });
        }

        Ok(())
    }

    fn resolve_primary_entry(
        &self,
        type_id: TypeId,
        requested: &str,
        path: &mut ResolutionPath,
    ) -> Result<(String, ManagedBean, CastFunction), ContainerError> {
        let mut candidates = Vec::new();
        for name in self.registry.names_of_type(type_id) {
            let definition = self.registry.merged_definition(&name)?;
            if definition.is_autowire_candidate() && !definition.abstract_definition {
                candidates.push((name, definition));
            }
        }

        let chosen = if candidates.len() == 1 {
            candidates.pop()
        } else {
            let mut primaries = candidates
                .iter()
                .filter(|(_, definition)| definition.is_primary());
            let first = primaries.next().cloned();
            if primaries.next().is_some() {
                None
            } else {
                first
            }
        };

        let Some((name, definition)) = chosen else {
            return Err(ContainerError::AmbiguousResolution {
                requested: requested.to_string(),
                candidates: candidates.into_iter().map(|(name, _)| name).collect(),
            });
        };

        let cast = self.binding_cast(&name, &definition, type_id)?;
        let bean = self.resolve(&name, path)?;

        Ok((name, bean, cast))
    }

    fn binding_cast(
        &self,
        name: &str,
        definition: &BeanDefinition,
        type_id: TypeId,
    ) -> Result<CastFunction, ContainerError> {
        definition
            .binding_for(type_id)
            .map(|binding| binding.cast)
            .ok_or_else(|| ContainerError::IncompatibleBean {
                name: name.to_string(),
                requested: format!("{type_id:?}"),
            })
    }

    fn construction_lock(&self, name: &str) -> Arc<Mutex<()>> {
        guard(self.construction_locks.lock())
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    fn set_status(&self, name: &str, status: BeanStatus) {
        guard(self.statuses.write()).insert(name.to_string(), status);
    }

    fn destroy_singletons(&self) {
        let order = std::mem::take(&mut *guard(self.construction_order.lock()));

        for name in order.iter().rev() {
            // waits for an in-flight construction of this bean to finish
            let lock = self.construction_lock(name);
            let _construction = guard(lock.lock());

            let Some(bean) = guard(self.singletons.write()).remove(name) else {
                continue;
            };

            if let Some(destroy) = self
                .registry
                .merged_definition(name)
                .ok()
                .and_then(|definition| definition.destroy_callback)
            {
                if let Err(error) = destroy.as_ref()(&bean) {
                    warn!(bean = %name, %error, "destroy callback failed");
                }
            }

            self.set_status(name, BeanStatus::Destroyed);
            debug!(bean = %name, "singleton destroyed");
        }

        guard(self.early_singletons.write()).clear();
    }
}

fn cast_into<T: ?Sized + 'static>(
    name: &str,
    bean: &ManagedBean,
    cast: CastFunction,
) -> Result<Arc<T>, ContainerError> {
    cast(bean.instance().clone())
        .ok()
        .and_then(|boxed| boxed.downcast::<Arc<T>>().ok())
        .map(|boxed| *boxed)
        .ok_or_else(|| ContainerError::IncompatibleBean {
            name: name.to_string(),
            requested: type_name::<T>().to_string(),
        })
}
