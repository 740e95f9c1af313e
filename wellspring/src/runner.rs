//! Runners executing actual application logic.

#[cfg(test)]
use mockall::automock;
use wellspring_ioc::container::BeanContainer;
use wellspring_ioc::instance::ErrorPtr;

/// Runs application logic once the container is refreshed. Runners are
/// ordinary beans bound to `dyn ApplicationRunner` and are discovered by
/// type-based lookup.
#[cfg_attr(test, automock)]
pub trait ApplicationRunner: Send + Sync {
    /// Runs any application code.
    fn run(&self, container: &BeanContainer) -> Result<(), ErrorPtr>;

    /// Returns the priority for this runner. Higher priorities get run first.
    /// Default 0.
    fn priority(&self) -> i8 {
        0
    }
}
