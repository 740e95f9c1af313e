//! Bridges aspect bindings into the bean lifecycle: an ordinary post-processor
//! which substitutes freshly initialized beans with interception proxies when
//! a pointcut matches.

use crate::advice::{Advice, AdviceBinding};
use crate::pointcut::Pointcut;
use crate::proxy::ProxyFactory;
use std::sync::Arc;
use tracing::{debug, trace};
use wellspring_ioc::instance::{ErrorPtr, ManagedBean};
use wellspring_ioc::post_processor::{BeanPostProcessor, ProcessorOutcome};

/// Applies pointcut-matched advice to beans after initialization. Beans
/// without an invocable surface, or with no matched method, pass through
/// untouched; proxy-creation failures abort the bean's construction.
pub struct AspectPostProcessor {
    factory: ProxyFactory,
    bindings: Vec<AdviceBinding>,
}

impl AspectPostProcessor {
    pub fn new(factory: ProxyFactory) -> Self {
        Self {
            factory,
            bindings: Vec::new(),
        }
    }

    /// Aspect processor using delegation-based proxies.
    pub fn delegating() -> Self {
        Self::new(ProxyFactory::delegating())
    }

    /// Aspect processor using override-table proxies.
    pub fn overriding() -> Self {
        Self::new(ProxyFactory::overriding())
    }

    /// Binds advice to the methods a pointcut selects.
    pub fn bind(mut self, pointcut: Pointcut, advice: Arc<dyn Advice>) -> Self {
        self.bindings.push(AdviceBinding::new(pointcut, advice));
        self
    }

    pub fn with_binding(mut self, binding: AdviceBinding) -> Self {
        self.bindings.push(binding);
        self
    }
}

impl BeanPostProcessor for AspectPostProcessor {
    fn after_initialization(
        &self,
        bean: ManagedBean,
        name: &str,
    ) -> Result<ProcessorOutcome, ErrorPtr> {
        match self.factory.create_proxy_if_matched(name, &bean, &self.bindings) {
            Ok(Some(proxy)) => {
                debug!(bean = name, "substituted bean with interception proxy");
                Ok(ProcessorOutcome::Continue(proxy))
            }
            Ok(None) => {
                trace!(bean = name, "no pointcut matched, leaving bean untouched");
                Ok(ProcessorOutcome::Continue(bean))
            }
            Err(error) => Err(Arc::new(error) as ErrorPtr),
        }
    }
}
