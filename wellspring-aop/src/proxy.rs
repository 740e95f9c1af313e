//! Proxy creation. A proxy satisfies the same capability surface as its
//! target, runs bound advice around matched method calls, and behaves exactly
//! like the target everywhere else.

use crate::advice::{Advice, AdviceBinding, Invocation};
use fxhash::FxHashMap;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};
use wellspring_ioc::instance::ManagedBean;
use wellspring_ioc::reflect::{
    BoundMethod, CallArgs, CallResult, Invocable, InvocationError, MethodDescriptor, MethodTable,
    TypeInfo,
};

/// Errors raised while creating proxies.
#[derive(Error, Clone, Debug)]
pub enum ProxyError {
    #[error("cannot proxy '{target}': {reason}")]
    NonProxyableTarget {
        target: String,
        reason: &'static str,
    },
}

/// Advice matched per method of one type. Computed once at proxy-creation time
/// and cached on the proxy - matching never happens per call.
#[derive(Clone, Default)]
pub struct InterceptionPlan {
    matched: FxHashMap<&'static str, (&'static MethodDescriptor, Vec<Arc<dyn Advice>>)>,
}

impl InterceptionPlan {
    pub fn compute(info: &'static TypeInfo, bindings: &[AdviceBinding]) -> Self {
        let mut matched: FxHashMap<&'static str, (&'static MethodDescriptor, Vec<Arc<dyn Advice>>)> =
            Default::default();

        for method in info.methods {
            for binding in bindings {
                if binding.pointcut.matches(info, method) {
                    matched
                        .entry(method.name)
                        .or_insert_with(|| (method, Vec::new()))
                        .1
                        .push(binding.advice.clone());
                }
            }
        }

        Self { matched }
    }

    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }

    pub fn matched_methods(&self) -> usize {
        self.matched.len()
    }

    fn advice_for(&self, method: &str) -> Option<&(&'static MethodDescriptor, Vec<Arc<dyn Advice>>)> {
        self.matched.get(method)
    }
}

/// Produces a substitute object for a target bean.
#[cfg_attr(test, automock)]
pub trait ProxyStrategy: Send + Sync {
    fn create_proxy(
        &self,
        name: &str,
        target: &ManagedBean,
        plan: InterceptionPlan,
    ) -> Result<ManagedBean, ProxyError>;
}

struct DelegationProxy {
    delegate: Arc<dyn Invocable>,
    plan: InterceptionPlan,
}

impl Invocable for DelegationProxy {
    fn type_info(&self) -> &'static TypeInfo {
        self.delegate.type_info()
    }

    fn invoke(&self, method: &str, args: CallArgs<'_>) -> Result<CallResult, InvocationError> {
        let Some((descriptor, advice)) = self.plan.advice_for(method) else {
            // unmatched: exactly one delegation hop, no advice overhead
            return self.delegate.invoke(method, args);
        };

        let invocation = Invocation {
            type_info: self.type_info(),
            method: *descriptor,
            args,
        };

        for bound in advice {
            bound.before(&invocation);
        }

        let result = self.delegate.invoke(method, args)?;

        for bound in advice.iter().rev() {
            bound.after(&invocation);
        }

        Ok(result)
    }
}

/// Decorator-style interception: the proxy holds the original as a delegate
/// and forwards every call to it. Requires the target's [Invocable] view.
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct DelegationProxyStrategy;

impl ProxyStrategy for DelegationProxyStrategy {
    fn create_proxy(
        &self,
        name: &str,
        target: &ManagedBean,
        plan: InterceptionPlan,
    ) -> Result<ManagedBean, ProxyError> {
        let delegate = target
            .invocable()
            .cloned()
            .ok_or_else(|| ProxyError::NonProxyableTarget {
                target: name.to_string(),
                reason: "the bean does not expose an invocable capability surface",
            })?;

        debug!(
            bean = name,
            methods = plan.matched_methods(),
            "creating delegation proxy"
        );

        Ok(ManagedBean::from_invocable(Arc::new(DelegationProxy {
            delegate,
            plan,
        })))
    }
}

struct OverrideProxy {
    info: &'static TypeInfo,
    table: MethodTable,
}

impl Invocable for OverrideProxy {
    fn type_info(&self) -> &'static TypeInfo {
        self.info
    }

    fn invoke(&self, method: &str, args: CallArgs<'_>) -> Result<CallResult, InvocationError> {
        let entry = self
            .table
            .get(method)
            .ok_or_else(|| InvocationError::UnknownMethod {
                type_name: self.info.type_name,
                method: method.to_string(),
            })?;

        entry.as_ref()(args)
    }

    fn method_table(self: Arc<Self>) -> Option<MethodTable> {
        // proxies stay override-proxyable themselves
        Some(self.table.clone())
    }
}

/// Subclass-style interception: the target's bound method table is copied and
/// matched entries are overridden in place, keeping the original entry as the
/// preserved "super" call path. Unmatched methods dispatch to the original
/// entry directly. Requires the target to provide a bound method table.
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct OverrideProxyStrategy;

impl ProxyStrategy for OverrideProxyStrategy {
    fn create_proxy(
        &self,
        name: &str,
        target: &ManagedBean,
        plan: InterceptionPlan,
    ) -> Result<ManagedBean, ProxyError> {
        let invocable = target
            .invocable()
            .cloned()
            .ok_or_else(|| ProxyError::NonProxyableTarget {
                target: name.to_string(),
                reason: "the bean does not expose an invocable capability surface",
            })?;

        let info = invocable.type_info();
        let mut table = invocable
            .method_table()
            .ok_or_else(|| ProxyError::NonProxyableTarget {
                target: name.to_string(),
                reason: "the bean does not provide a bound method table",
            })?;

        for (method_name, (descriptor, advice)) in &plan.matched {
            let Some(original) = table.get(method_name).cloned() else {
                trace!(
                    bean = name,
                    method = *method_name,
                    "matched method has no table entry, skipping"
                );
                continue;
            };

            let descriptor = *descriptor;
            let advice = advice.clone();
            let wrapped: BoundMethod = Arc::new(move |args| {
                let invocation = Invocation {
                    type_info: info,
                    method: descriptor,
                    args,
                };

                for bound in &advice {
                    bound.before(&invocation);
                }

                let result = original.as_ref()(args)?;

                for bound in advice.iter().rev() {
                    bound.after(&invocation);
                }

                Ok(result)
            });

            table.insert(*method_name, wrapped);
        }

        debug!(
            bean = name,
            methods = plan.matched_methods(),
            "creating override proxy"
        );

        Ok(ManagedBean::from_invocable(Arc::new(OverrideProxy {
            info,
            table,
        })))
    }
}

/// Front for a chosen [ProxyStrategy]: computes the interception plan for a
/// target and asks the strategy for the substitute object.
pub struct ProxyFactory {
    strategy: Arc<dyn ProxyStrategy>,
}

impl ProxyFactory {
    pub fn new(strategy: Arc<dyn ProxyStrategy>) -> Self {
        Self { strategy }
    }

    /// Delegation-based interception (decorator over the capability set).
    pub fn delegating() -> Self {
        Self::new(Arc::new(DelegationProxyStrategy))
    }

    /// Override-table interception (subclass-style, preserved super path).
    pub fn overriding() -> Self {
        Self::new(Arc::new(OverrideProxyStrategy))
    }

    pub fn create_proxy(
        &self,
        name: &str,
        target: &ManagedBean,
        bindings: &[AdviceBinding],
    ) -> Result<ManagedBean, ProxyError> {
        let plan = self
            .plan_for(target, bindings)
            .ok_or_else(|| ProxyError::NonProxyableTarget {
                target: name.to_string(),
                reason: "the bean does not expose an invocable capability surface",
            })?;

        self.strategy.create_proxy(name, target, plan)
    }

    /// Creates a proxy only when at least one method matched; beans without a
    /// capability surface or without matches pass through as `None`.
    pub fn create_proxy_if_matched(
        &self,
        name: &str,
        target: &ManagedBean,
        bindings: &[AdviceBinding],
    ) -> Result<Option<ManagedBean>, ProxyError> {
        match self.plan_for(target, bindings) {
            Some(plan) if !plan.is_empty() => {
                self.strategy.create_proxy(name, target, plan).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn plan_for(&self, target: &ManagedBean, bindings: &[AdviceBinding]) -> Option<InterceptionPlan> {
        target
            .invocable()
            .map(|invocable| InterceptionPlan::compute(invocable.type_info(), bindings))
    }
}
