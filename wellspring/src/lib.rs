//! Application bootstrapping on top of `wellspring-ioc`: loads
//! [configuration](config), optionally installs a tracing logger, refreshes
//! the container and executes discovered [runners](runner).

pub mod application;
pub mod config;
pub mod runner;
