//! Service provider used to resolve consumer instances.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type Factory = Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// A minimal type-keyed service registry.
///
/// Consumers bound to an endpoint are resolved from here for every message
/// they handle: singletons return the same instance each time, transients a
/// fresh one.
///
/// ```
/// use bus_conventions::bus::ServiceProvider;
///
/// struct Clock;
///
/// let services = ServiceProvider::new().with_singleton(Clock);
/// assert!(services.resolve::<Clock>().is_some());
/// ```
#[derive(Clone, Default)]
pub struct ServiceProvider {
    factories: HashMap<TypeId, Factory>,
}

impl ServiceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared instance of `T`.
    pub fn with_singleton<T: Send + Sync + 'static>(mut self, instance: T) -> Self {
        let instance: Arc<dyn Any + Send + Sync> = Arc::new(instance);
        self.factories
            .insert(TypeId::of::<T>(), Arc::new(move || Arc::clone(&instance)));
        self
    }

    /// Register a factory producing a new `T` per resolution.
    pub fn with_transient<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factories.insert(
            TypeId::of::<T>(),
            Arc::new(move || Arc::new(factory()) as Arc<dyn Any + Send + Sync>),
        );
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<T>())
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let factory = self.factories.get(&TypeId::of::<T>())?;
        factory().downcast::<T>().ok()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(usize);

    #[test]
    fn singleton_is_shared() {
        let services = ServiceProvider::new().with_singleton(Counter(7));
        let a = services.resolve::<Counter>().unwrap();
        let b = services.resolve::<Counter>().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.0, 7);
    }

    #[test]
    fn transient_builds_per_resolution() {
        let built = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&built);
        let services = ServiceProvider::new()
            .with_transient(move || Counter(seen.fetch_add(1, Ordering::SeqCst)));

        assert_eq!(services.resolve::<Counter>().unwrap().0, 0);
        assert_eq!(services.resolve::<Counter>().unwrap().0, 1);
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unknown_type_is_none() {
        let services = ServiceProvider::new();
        assert!(!services.contains::<Counter>());
        assert!(services.resolve::<Counter>().is_none());
        assert!(services.is_empty());
    }
}
