//! Registries of bean definitions. Written by a definition source before the
//! container is built, read-only for the container's whole lifetime.

use crate::definition::BeanDefinition;
use crate::error::BeanDefinitionRegistryError;
use fxhash::FxHashMap;
use std::any::TypeId;

/// A named map of bean definitions with type-based lookup support.
pub trait BeanDefinitionRegistry: Send + Sync {
    /// Registers a definition under a unique name. Handling of duplicate names
    /// depends on the registry's overriding policy.
    fn register(
        &mut self,
        name: &str,
        definition: BeanDefinition,
    ) -> Result<(), BeanDefinitionRegistryError>;

    /// Returns the raw definition registered under `name`.
    fn definition(&self, name: &str) -> Option<&BeanDefinition>;

    /// Returns the effective definition for `name`, with unset attributes
    /// copied from its parent definition, if one is named. Only single-level
    /// inheritance is supported.
    fn merged_definition(&self, name: &str)
        -> Result<BeanDefinition, BeanDefinitionRegistryError>;

    /// Names of all definitions declaring a binding for `type_id`, in
    /// registration order.
    fn names_of_type(&self, type_id: TypeId) -> Vec<String>;

    /// All registered names, in registration order.
    fn names(&self) -> Vec<String>;

    fn contains(&self, name: &str) -> bool;
}

/// Registry backed by plain maps, bulk-loaded programmatically.
#[derive(Default)]
pub struct StaticBeanDefinitionRegistry {
    definitions: FxHashMap<String, BeanDefinition>,
    registration_order: Vec<String>,
    type_index: FxHashMap<TypeId, Vec<String>>,
    allow_definition_overriding: bool,
}

impl StaticBeanDefinitionRegistry {
    pub fn new(allow_definition_overriding: bool) -> Self {
        Self {
            allow_definition_overriding,
            ..Default::default()
        }
    }

    fn remove_from_index(&mut self, name: &str) {
        if let Some(old) = self.definitions.get(name) {
            for binding in &old.bindings {
                if let Some(names) = self.type_index.get_mut(&binding.type_id) {
                    names.retain(|indexed| indexed != name);
                }
            }
        }
    }
}

impl BeanDefinitionRegistry for StaticBeanDefinitionRegistry {
    fn register(
        &mut self,
        name: &str,
        definition: BeanDefinition,
    ) -> Result<(), BeanDefinitionRegistryError> {
        if self.definitions.contains_key(name) {
            if !self.allow_definition_overriding {
                return Err(BeanDefinitionRegistryError::DuplicateDefinition(
                    name.to_string(),
                ));
            }

            self.remove_from_index(name);
        } else {
            self.registration_order.push(name.to_string());
        }

        for binding in &definition.bindings {
            self.type_index
                .entry(binding.type_id)
                .or_default()
                .push(name.to_string());
        }

        self.definitions.insert(name.to_string(), definition);

        Ok(())
    }

    fn definition(&self, name: &str) -> Option<&BeanDefinition> {
        self.definitions.get(name)
    }

    fn merged_definition(
        &self,
        name: &str,
    ) -> Result<BeanDefinition, BeanDefinitionRegistryError> {
        let child = self
            .definitions
            .get(name)
            .ok_or_else(|| BeanDefinitionRegistryError::NoSuchDefinition(name.to_string()))?;

        let Some(parent_name) = &child.parent_name else {
            return Ok(child.clone());
        };

        let parent = self.definitions.get(parent_name).ok_or_else(|| {
            BeanDefinitionRegistryError::NoSuchDefinition(parent_name.clone())
        })?;

        if parent.parent_name.is_some() {
            return Err(BeanDefinitionRegistryError::NestedDefinitionInheritance {
                child: name.to_string(),
                parent: parent_name.clone(),
            });
        }

        let mut merged = child.clone();
        merged.instantiator = merged
            .instantiator
            .or_else(|| parent.instantiator.clone());
        merged.populate = merged.populate.or_else(|| parent.populate.clone());
        merged.scope = merged.scope.or(parent.scope);
        merged.lazy = merged.lazy.or(parent.lazy);
        merged.autowire_candidate = merged.autowire_candidate.or(parent.autowire_candidate);
        merged.primary = merged.primary.or(parent.primary);
        merged.init_callback = merged
            .init_callback
            .or_else(|| parent.init_callback.clone());
        merged.destroy_callback = merged
            .destroy_callback
            .or_else(|| parent.destroy_callback.clone());
        merged.role = merged.role.or(parent.role);

        if merged.depends_on.is_empty() {
            merged.depends_on = parent.depends_on.clone();
        }

        if merged.bindings.is_empty() {
            merged.bindings = parent.bindings.clone();
        }

        Ok(merged)
    }

    fn names_of_type(&self, type_id: TypeId) -> Vec<String> {
        self.type_index.get(&type_id).cloned().unwrap_or_default()
    }

    fn names(&self) -> Vec<String> {
        self.registration_order.clone()
    }

    #[inline]
    fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }
}
