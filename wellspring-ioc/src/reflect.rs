//! The capability surface interception operates over. Rust has no runtime
//! reflection, so beans which opt into proxying describe their methods with
//! const-constructible [TypeInfo] tables and dispatch dynamically through
//! [Invocable]. Beans which never need interception can ignore this module
//! entirely.

use fxhash::FxHashMap;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by dynamic method dispatch.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum InvocationError {
    #[error("unknown method '{method}' on type {type_name}")]
    UnknownMethod {
        type_name: &'static str,
        method: String,
    },
    #[error("argument mismatch calling '{method}': expected {expected} arguments, got {actual}")]
    ArgumentMismatch {
        method: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Visibility {
    Public,
    Private,
}

/// Describes a single invocable method. All fields are const-constructible, so
/// descriptor tables can live in statics shared by every instance of a type.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub visibility: Visibility,
    /// Parameter type names, in declaration order.
    pub params: &'static [&'static str],
    /// Marker attributes carried by the method.
    pub markers: &'static [&'static str],
}

/// Describes one invocable type: its identity, where it lives, the markers it
/// carries and the methods it exposes.
#[derive(Debug)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub module_path: &'static str,
    pub markers: &'static [&'static str],
    pub methods: &'static [MethodDescriptor],
}

impl TypeInfo {
    pub fn method(&self, name: &str) -> Option<&'static MethodDescriptor> {
        self.methods.iter().find(|method| method.name == name)
    }

    pub fn public_methods(&self) -> impl Iterator<Item = &'static MethodDescriptor> {
        self.methods
            .iter()
            .filter(|method| method.visibility == Visibility::Public)
    }
}

pub type CallArgs<'a> = &'a [&'a (dyn Any + Send + Sync)];

pub type CallResult = Box<dyn Any + Send + Sync>;

/// A method implementation already bound to a live instance.
pub type BoundMethod = Arc<dyn Fn(CallArgs<'_>) -> Result<CallResult, InvocationError> + Send + Sync>;

/// Bound entry points of one live instance, keyed by method name.
pub type MethodTable = FxHashMap<&'static str, BoundMethod>;

/// Dynamic dispatch surface of a proxyable bean. A proxy over an `Invocable`
/// advertises the same [TypeInfo] as its target.
pub trait Invocable: Send + Sync {
    fn type_info(&self) -> &'static TypeInfo;

    /// Invokes a described method by name.
    fn invoke(&self, method: &str, args: CallArgs<'_>) -> Result<CallResult, InvocationError>;

    /// Bound per-method entry points, used by override-style proxies to keep a
    /// direct call path to the original implementations. Returning `None` opts
    /// the type out of override-based proxying.
    fn method_table(self: Arc<Self>) -> Option<MethodTable> {
        None
    }
}

/// Builds a method table routing every described method through
/// [Invocable::invoke]. A convenient [Invocable::method_table] implementation
/// for types without hand-bound entries.
pub fn bind_method_table<T: Invocable + 'static>(instance: &Arc<T>) -> MethodTable {
    instance
        .type_info()
        .methods
        .iter()
        .map(|descriptor| {
            let target = Arc::clone(instance);
            let name = descriptor.name;
            (
                name,
                Arc::new(move |args: CallArgs<'_>| target.invoke(name, args)) as BoundMethod,
            )
        })
        .collect()
}
