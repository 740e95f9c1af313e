//! Strategies turning a merged definition into a raw bean instance. Pure
//! construction: no post-processing or lifecycle callbacks happen here.

use crate::definition::{BeanDefinition, Instantiator};
use crate::error::ContainerError;
use crate::instance::{BeanResolver, ManagedBean};
#[cfg(test)]
use mockall::automock;

/// Produces raw instances from merged definitions.
#[cfg_attr(test, automock)]
pub trait InstantiationStrategy: Send + Sync {
    fn instantiate(
        &self,
        name: &str,
        definition: &BeanDefinition,
        resolver: &mut dyn BeanResolver,
    ) -> Result<ManagedBean, ContainerError>;
}

/// Default strategy: drives the constructor or factory-method closure carried
/// by the definition, resolving the factory bean first where needed.
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct SupplierInstantiationStrategy;

impl InstantiationStrategy for SupplierInstantiationStrategy {
    fn instantiate(
        &self,
        name: &str,
        definition: &BeanDefinition,
        resolver: &mut dyn BeanResolver,
    ) -> Result<ManagedBean, ContainerError> {
        if definition.abstract_definition {
            return Err(ContainerError::InvalidDefinition {
                name: name.to_string(),
                reason: "abstract definitions are templates and cannot be instantiated"
                    .to_string(),
            });
        }

        match &definition.instantiator {
            Some(Instantiator::Constructor(constructor)) => constructor.as_ref()(resolver),
            Some(Instantiator::Factory {
                factory_bean,
                factory_method,
            }) => {
                let factory = resolver.resolve_named(factory_bean)?;
                factory_method.as_ref()(&factory, resolver)
            }
            None => Err(ContainerError::InvalidDefinition {
                name: name.to_string(),
                reason: "neither a constructor nor a factory is set".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::definition::BeanDefinition;
    use crate::error::ContainerError;
    use crate::instance::{BeanResolver, ManagedBean};
    use crate::instantiation::{InstantiationStrategy, SupplierInstantiationStrategy};
    use std::any::TypeId;

    struct SingleBeanResolver {
        name: &'static str,
        bean: ManagedBean,
    }

    impl BeanResolver for SingleBeanResolver {
        fn resolve_named(&mut self, name: &str) -> Result<ManagedBean, ContainerError> {
            if name == self.name {
                Ok(self.bean.clone())
            } else {
                Err(ContainerError::InvalidDefinition {
                    name: name.to_string(),
                    reason: "unexpected resolution".to_string(),
                })
            }
        }

        fn resolve_primary(&mut self, type_id: TypeId) -> Result<ManagedBean, ContainerError> {
            Err(ContainerError::AmbiguousResolution {
                requested: format!("{type_id:?}"),
                candidates: vec![],
            })
        }
    }

    fn resolver() -> SingleBeanResolver {
        SingleBeanResolver {
            name: "factory",
            bean: ManagedBean::from_value(2_i32),
        }
    }

    #[test]
    fn should_drive_constructor() {
        let definition = BeanDefinition::for_type::<i32, _>(|_| Ok(1));

        let bean = SupplierInstantiationStrategy
            .instantiate("bean", &definition, &mut resolver())
            .unwrap();

        assert_eq!(*bean.downcast::<i32>().unwrap(), 1);
    }

    #[test]
    fn should_drive_factory_method() {
        let definition = BeanDefinition::new().with_factory("factory", |factory, _| {
            let base = factory.downcast::<i32>().unwrap();
            Ok(ManagedBean::from_value(*base * 10))
        });

        let bean = SupplierInstantiationStrategy
            .instantiate("bean", &definition, &mut resolver())
            .unwrap();

        assert_eq!(*bean.downcast::<i32>().unwrap(), 20);
    }

    #[test]
    fn should_reject_abstract_definition() {
        let definition = BeanDefinition::for_type::<i32, _>(|_| Ok(1)).as_abstract();

        assert!(matches!(
            SupplierInstantiationStrategy
                .instantiate("bean", &definition, &mut resolver())
                .unwrap_err(),
            ContainerError::InvalidDefinition { .. }
        ));
    }

    #[test]
    fn should_reject_definition_without_instantiator() {
        assert!(matches!(
            SupplierInstantiationStrategy
                .instantiate("bean", &BeanDefinition::new(), &mut resolver())
                .unwrap_err(),
            ContainerError::InvalidDefinition { .. }
        ));
    }
}
