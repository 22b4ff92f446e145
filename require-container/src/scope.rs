//! Instance scopes.
//!
//! A scope strategy wraps a zero-argument producer and returns a
//! zero-argument accessor with the same contract. The strategy decides
//! whether the accessor reuses earlier results:
//! - [`oneshot`] — every access calls the producer again
//! - [`singleton`] — the first successful result is cached forever
//!
//! New scopes are plain functions with the same shape, wrapped into a
//! [`Scope`] via [`Scope::custom`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::Result;

/// A shared, type-erased instance handed out by exports.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Zero-argument function producing an instance.
///
/// Scopes receive a producer and return an accessor of the same type.
pub type Producer = Arc<dyn Fn() -> Result<Instance> + Send + Sync>;

/// Zero-argument function returning the scope-managed instance.
pub type Accessor = Producer;

/// Scope `oneshot`: no caching, the accessor is the producer itself.
pub fn oneshot(producer: Producer) -> Accessor {
    producer
}

/// Scope `singleton`: the first successful result is cached.
///
/// The cache is private to the returned accessor. Initialization runs
/// exactly once even when several threads race on first access; a
/// failed producer call leaves the cache empty.
pub fn singleton(producer: Producer) -> Accessor {
    let cell: Arc<OnceCell<Instance>> = Arc::new(OnceCell::new());

    Arc::new(move || -> Result<Instance> {
        let instance = cell.get_or_try_init(|| producer())?;
        Ok(instance.clone())
    })
}

/// Behaviour shared by all scopes.
pub trait ScopeStrategy: Send + Sync {
    /// Name used for display and comparison.
    fn name(&self) -> &str;

    /// Returns `true` if accessors of this scope reuse instances.
    fn is_cached(&self) -> bool;

    /// Wraps a producer into an accessor.
    fn wrap(&self, producer: Producer) -> Accessor;
}

struct FnStrategy<F> {
    name: String,
    cached: bool,
    wrap: F,
}

impl<F> ScopeStrategy for FnStrategy<F>
where
    F: Fn(Producer) -> Accessor + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_cached(&self) -> bool {
        self.cached
    }

    fn wrap(&self, producer: Producer) -> Accessor {
        (self.wrap)(producer)
    }
}

/// Defines how long an export's instance lives.
///
/// # Examples
/// ```
/// use require_container::scope::Scope;
///
/// assert_eq!(Scope::default(), Scope::singleton());
/// assert!(Scope::singleton().is_cached());
/// assert!(!Scope::oneshot().is_cached());
/// ```
#[derive(Clone)]
pub struct Scope {
    strategy: Arc<dyn ScopeStrategy>,
}

impl Scope {
    /// New instance on every access.
    pub fn oneshot() -> Self {
        Self::custom("oneshot", false, oneshot)
    }

    /// One instance for the lifetime of the export.
    pub fn singleton() -> Self {
        Self::custom("singleton", true, singleton)
    }

    /// Builds a scope from a wrapping function.
    ///
    /// `cached` tells the module whether accessors of this scope may
    /// hand out an instance created before a later extension.
    pub fn custom<F>(name: impl Into<String>, cached: bool, wrap: F) -> Self
    where
        F: Fn(Producer) -> Accessor + Send + Sync + 'static,
    {
        Self::from_strategy(FnStrategy {
            name: name.into(),
            cached,
            wrap,
        })
    }

    /// Builds a scope from a [`ScopeStrategy`] implementation.
    pub fn from_strategy(strategy: impl ScopeStrategy + 'static) -> Self {
        Self {
            strategy: Arc::new(strategy),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    /// Returns `true` if this scope caches instances.
    #[inline]
    pub fn is_cached(&self) -> bool {
        self.strategy.is_cached()
    }

    /// Wraps a producer into this scope's accessor.
    pub fn wrap(&self, producer: Producer) -> Accessor {
        self.strategy.wrap(producer)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::singleton()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Scope {}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({})", self.name())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_producer(counter: Arc<AtomicU32>) -> Producer {
        Arc::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(n) as Instance)
        })
    }

    #[test]
    fn oneshot_calls_producer_every_time() {
        let counter = Arc::new(AtomicU32::new(0));
        let accessor = oneshot(counting_producer(counter.clone()));

        let a = accessor().unwrap();
        let b = accessor().unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn singleton_calls_producer_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let accessor = singleton(counting_producer(counter.clone()));

        let a = accessor().unwrap();
        let b = accessor().unwrap();
        let c = accessor().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn singleton_cache_is_private_per_accessor() {
        let counter = Arc::new(AtomicU32::new(0));
        let first = singleton(counting_producer(counter.clone()));
        let second = singleton(counting_producer(counter.clone()));

        let a = first().unwrap();
        let b = second().unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn singleton_retries_after_failure() {
        let attempts = Arc::new(AtomicU32::new(0));
        let accessor = singleton({
            let attempts = attempts.clone();
            Arc::new(move || {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(crate::error::RequireError::construction("flaky", "first call fails"))
                } else {
                    Ok(Arc::new("ready") as Instance)
                }
            })
        });

        assert!(accessor().is_err());
        let value = accessor().unwrap();
        assert_eq!(value.downcast_ref::<&str>(), Some(&"ready"));
        accessor().unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn singleton_created_once_across_threads() {
        let counter = Arc::new(AtomicU32::new(0));
        let accessor = singleton(counting_producer(counter.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let accessor = accessor.clone();
                std::thread::spawn(move || accessor().unwrap())
            })
            .collect();

        let instances: Vec<Instance> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn custom_scope_wraps_producer() {
        // Caches the first two results and alternates between them.
        let alternating = Scope::custom("alternating", true, |producer: Producer| {
            let slots = Arc::new(parking_lot::Mutex::new((Vec::<Instance>::new(), 0usize)));
            Arc::new(move || -> Result<Instance> {
                let mut guard = slots.lock();
                let (cache, turn) = &mut *guard;
                if cache.len() < 2 {
                    cache.push(producer()?);
                }
                let instance = cache[*turn % cache.len()].clone();
                *turn += 1;
                Ok(instance)
            }) as Accessor
        });

        let counter = Arc::new(AtomicU32::new(0));
        let accessor = alternating.wrap(counting_producer(counter.clone()));

        let a = accessor().unwrap();
        let b = accessor().unwrap();
        let c = accessor().unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
        assert_eq!(alternating.name(), "alternating");
    }

    #[test]
    fn scope_equality_and_display() {
        assert_eq!(Scope::singleton(), Scope::singleton());
        assert_ne!(Scope::singleton(), Scope::oneshot());
        assert_eq!(format!("{}", Scope::oneshot()), "oneshot");
        assert_eq!(format!("{:?}", Scope::singleton()), "Scope(singleton)");
    }
}
