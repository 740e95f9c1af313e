//! Cross-cutting behavior for `wellspring-ioc` beans: [pointcuts](pointcut)
//! select methods, [advice](advice) runs around matched calls, and
//! [proxies](proxy) substitute beans with intercepting versions. The
//! [AspectPostProcessor](processor::AspectPostProcessor) wires all of it into
//! the container's post-processing chain.

pub mod advice;
pub mod pointcut;
pub mod processor;
pub mod proxy;
