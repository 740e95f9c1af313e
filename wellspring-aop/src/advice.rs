//! Advice is the behavior run around matched method calls. A binding pairs a
//! [Pointcut](crate::pointcut::Pointcut) with the advice to apply.

use crate::pointcut::Pointcut;
use std::sync::Arc;
use wellspring_ioc::reflect::{CallArgs, MethodDescriptor, TypeInfo};

/// The matched call being intercepted, as seen by advice.
pub struct Invocation<'a> {
    pub type_info: &'static TypeInfo,
    pub method: &'static MethodDescriptor,
    pub args: CallArgs<'a>,
}

/// Cross-cutting behavior bound to matched methods. Both callbacks default to
/// no-ops; before-advice is the common case.
pub trait Advice: Send + Sync {
    /// Runs before the matched call proceeds.
    fn before(&self, _invocation: &Invocation<'_>) {}

    /// Runs after the matched call returned successfully.
    fn after(&self, _invocation: &Invocation<'_>) {}
}

/// Advice from a plain closure run before matched calls.
pub fn before_advice<F>(function: F) -> Arc<dyn Advice>
where
    F: Fn(&Invocation<'_>) + Send + Sync + 'static,
{
    struct FnAdvice<F>(F);

    impl<F: Fn(&Invocation<'_>) + Send + Sync> Advice for FnAdvice<F> {
        fn before(&self, invocation: &Invocation<'_>) {
            (self.0)(invocation)
        }
    }

    Arc::new(FnAdvice(function))
}

/// Pairs a pointcut with the advice to run on methods it matches.
#[derive(Clone)]
pub struct AdviceBinding {
    pub pointcut: Pointcut,
    pub advice: Arc<dyn Advice>,
}

impl AdviceBinding {
    pub fn new(pointcut: Pointcut, advice: Arc<dyn Advice>) -> Self {
        Self { pointcut, advice }
    }
}
