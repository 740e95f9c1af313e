//! Hooks running around every bean's initialization. Each hook can replace the
//! instance it is handed, which is how proxy substitution reaches the
//! container pipeline.

use crate::error::ContainerError;
use crate::instance::{ErrorPtr, ManagedBean};
use std::sync::Arc;

/// Verdict of a single hook invocation.
pub enum ProcessorOutcome {
    /// Hand the (possibly replaced) bean to the next hook.
    Continue(ManagedBean),
    /// Keep this bean and skip the remaining hooks of this phase for this bean.
    Halt(ManagedBean),
}

/// A hook invoked around the initialization of every bean. Both callbacks
/// default to identity.
pub trait BeanPostProcessor: Send + Sync {
    fn before_initialization(
        &self,
        bean: ManagedBean,
        _name: &str,
    ) -> Result<ProcessorOutcome, ErrorPtr> {
        Ok(ProcessorOutcome::Continue(bean))
    }

    fn after_initialization(
        &self,
        bean: ManagedBean,
        _name: &str,
    ) -> Result<ProcessorOutcome, ErrorPtr> {
        Ok(ProcessorOutcome::Continue(bean))
    }
}

/// Hooks in registration order, threading the possibly-replaced bean through
/// each phase. Any hook error aborts the bean's construction - no partial
/// instance is handed out.
#[derive(Default)]
pub struct PostProcessorChain {
    processors: Vec<Arc<dyn BeanPostProcessor>>,
}

impl PostProcessorChain {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, processor: Arc<dyn BeanPostProcessor>) {
        self.processors.push(processor);
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn run_before(&self, bean: ManagedBean, name: &str) -> Result<ManagedBean, ContainerError> {
        self.run(bean, name, |processor, bean| {
            processor.before_initialization(bean, name)
        })
    }

    pub fn run_after(&self, bean: ManagedBean, name: &str) -> Result<ManagedBean, ContainerError> {
        self.run(bean, name, |processor, bean| {
            processor.after_initialization(bean, name)
        })
    }

    fn run<F>(&self, mut bean: ManagedBean, name: &str, apply: F) -> Result<ManagedBean, ContainerError>
    where
        F: Fn(&dyn BeanPostProcessor, ManagedBean) -> Result<ProcessorOutcome, ErrorPtr>,
    {
        for processor in &self.processors {
            let outcome =
                apply(processor.as_ref(), bean).map_err(|cause| ContainerError::PostProcessing {
                    name: name.to_string(),
                    cause,
                })?;

            match outcome {
                ProcessorOutcome::Continue(next) => bean = next,
                ProcessorOutcome::Halt(next) => return Ok(next),
            }
        }

        Ok(bean)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ContainerError;
    use crate::instance::{ErrorPtr, ManagedBean};
    use crate::post_processor::{BeanPostProcessor, PostProcessorChain, ProcessorOutcome};
    use std::sync::Arc;

    struct AddingProcessor(i32);

    impl BeanPostProcessor for AddingProcessor {
        fn before_initialization(
            &self,
            bean: ManagedBean,
            _name: &str,
        ) -> Result<ProcessorOutcome, ErrorPtr> {
            let value = *bean.downcast::<i32>().unwrap();
            Ok(ProcessorOutcome::Continue(ManagedBean::from_value(
                value + self.0,
            )))
        }
    }

    struct HaltingProcessor;

    impl BeanPostProcessor for HaltingProcessor {
        fn before_initialization(
            &self,
            bean: ManagedBean,
            _name: &str,
        ) -> Result<ProcessorOutcome, ErrorPtr> {
            Ok(ProcessorOutcome::Halt(bean))
        }
    }

    struct FailingProcessor;

    impl BeanPostProcessor for FailingProcessor {
        fn after_initialization(
            &self,
            _bean: ManagedBean,
            _name: &str,
        ) -> Result<ProcessorOutcome, ErrorPtr> {
            Err(Arc::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "hook failure",
            )) as ErrorPtr)
        }
    }

    #[test]
    fn should_thread_replacements_in_registration_order() {
        let mut chain = PostProcessorChain::new();
        chain.push(Arc::new(AddingProcessor(1)));
        chain.push(Arc::new(AddingProcessor(10)));

        let bean = chain
            .run_before(ManagedBean::from_value(0_i32), "bean")
            .unwrap();

        assert_eq!(*bean.downcast::<i32>().unwrap(), 11);
    }

    #[test]
    fn should_short_circuit_on_halt() {
        let mut chain = PostProcessorChain::new();
        chain.push(Arc::new(AddingProcessor(1)));
        chain.push(Arc::new(HaltingProcessor));
        chain.push(Arc::new(AddingProcessor(10)));

        let bean = chain
            .run_before(ManagedBean::from_value(0_i32), "bean")
            .unwrap();

        assert_eq!(*bean.downcast::<i32>().unwrap(), 1);
    }

    #[test]
    fn should_default_to_identity() {
        struct IdentityProcessor;
        impl BeanPostProcessor for IdentityProcessor {}

        let mut chain = PostProcessorChain::new();
        chain.push(Arc::new(IdentityProcessor));

        let original = ManagedBean::from_value(0_i32);
        let bean = chain.run_after(original.clone(), "bean").unwrap();

        assert!(bean.is_same_instance(&original));
    }

    #[test]
    fn should_wrap_hook_errors() {
        let mut chain = PostProcessorChain::new();
        chain.push(Arc::new(FailingProcessor));

        assert!(matches!(
            chain
                .run_after(ManagedBean::from_value(0_i32), "bean")
                .unwrap_err(),
            ContainerError::PostProcessing { name, .. } if name == "bean"
        ));
    }
}
