//! Exports: named, scoped factories with an extension chain.
//!
//! An [`Export`] owns the factory registered under a name, the scope that
//! decides whether instances are reused, and the ordered list of
//! [`Extender`]s applied to every freshly created instance.
//!
//! ```text
//! call() ──> substitute installed? ──yes──> substitute()
//!                  │ no
//!                  ▼
//!             scope accessor ──(cache miss)──> factory() ─> extender 1 ─> ... ─> extender n
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::error::{RequireError, Result};
use crate::resolution;
use crate::scope::{Accessor, Instance, Producer, Scope};

/// A freshly created value, still exclusively owned by its export.
///
/// Extenders can mutate it in place before it is shared.
pub type Value = Box<dyn Any + Send + Sync>;

/// Type-erased factory producing a new value.
///
/// Requirements of the factory are already bound; see
/// [`Module::export`](crate::module::Module::export).
pub type Factory = Arc<dyn Fn() -> Result<Value> + Send + Sync>;

/// Type-erased extender function.
///
/// Returns `Some` to replace the value, `None` to keep the (possibly
/// mutated) current one.
pub type ExtendFn = Arc<dyn Fn(&mut Value) -> Result<Option<Value>> + Send + Sync>;

type ApplyFn = Arc<dyn Fn(&Instance, &mut Value) -> Result<Option<Value>> + Send + Sync>;

/// An extension function published as the instance of an export.
///
/// Registering another export as extender (see
/// [`Module::extend_with`](crate::module::Module::extend_with)) resolves
/// that export and applies the `Extension` it holds.
pub struct Extension<T> {
    apply: Arc<dyn Fn(&mut T) -> Result<Option<T>> + Send + Sync>,
}

impl<T> Extension<T> {
    pub fn new(apply: impl Fn(&mut T) -> Result<Option<T>> + Send + Sync + 'static) -> Self {
        Self {
            apply: Arc::new(apply),
        }
    }

    /// Applies the extension to a value.
    pub fn apply(&self, value: &mut T) -> Result<Option<T>> {
        (self.apply)(value)
    }
}

impl<T> Clone for Extension<T> {
    fn clone(&self) -> Self {
        Self {
            apply: self.apply.clone(),
        }
    }
}

/// A post-processing step applied to newly created instances.
///
/// The variant is chosen explicitly at registration time.
#[derive(Clone)]
pub enum Extender {
    /// A plain function receiving the current value.
    Function(ExtendFn),

    /// Resolve another export first, then apply the [`Extension`] it holds.
    Export { source: Arc<Export>, apply: ApplyFn },
}

impl Extender {
    /// Wraps an untyped extender function.
    pub fn function(
        extend: impl Fn(&mut Value) -> Result<Option<Value>> + Send + Sync + 'static,
    ) -> Self {
        Extender::Function(Arc::new(extend))
    }

    /// Wraps a typed extender for the export named `target`.
    ///
    /// The value is downcast to `T` before `extend` runs; a value of any
    /// other type fails with [`RequireError::TypeMismatch`].
    pub fn typed<T, F>(target: impl Into<String>, extend: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut T) -> Result<Option<T>> + Send + Sync + 'static,
    {
        let target = target.into();
        Extender::function(move |value: &mut Value| {
            let typed = value
                .downcast_mut::<T>()
                .ok_or_else(|| RequireError::type_mismatch::<T>(&target))?;
            Ok(extend(typed)?.map(|replacement| Box::new(replacement) as Value))
        })
    }

    /// Uses the instance of `source`, an [`Extension<T>`], as extender
    /// for the export named `target`.
    pub fn export<T>(target: impl Into<String>, source: Arc<Export>) -> Self
    where
        T: Any + Send + Sync,
    {
        let target = target.into();
        let source_name = source.name().to_string();

        let apply: ApplyFn = Arc::new(
            move |extension: &Instance, value: &mut Value| -> Result<Option<Value>> {
                let extension = extension
                    .downcast_ref::<Extension<T>>()
                    .ok_or_else(|| RequireError::type_mismatch::<Extension<T>>(&source_name))?;
                let typed = value
                    .downcast_mut::<T>()
                    .ok_or_else(|| RequireError::type_mismatch::<T>(&target))?;
                Ok(extension
                    .apply(typed)?
                    .map(|replacement| Box::new(replacement) as Value))
            },
        );

        Extender::Export { source, apply }
    }

    fn apply(&self, value: &mut Value) -> Result<Option<Value>> {
        match self {
            Extender::Function(extend) => extend(value),
            Extender::Export { source, apply } => {
                let extension = source.call()?;
                apply(&extension, value)
            }
        }
    }
}

impl fmt::Debug for Extender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extender::Function(_) => f.write_str("Extender::Function"),
            Extender::Export { source, .. } => {
                write!(f, "Extender::Export({})", source.name())
            }
        }
    }
}

static NEXT_SUBSTITUTION: AtomicU64 = AtomicU64::new(0);

/// Creation state shared between an export and its scoped getter.
struct Core {
    name: String,
    factory: Factory,
    extenders: RwLock<Vec<Extender>>,
}

impl Core {
    /// Runs the factory and applies all extenders in registration order.
    fn construct(&self) -> Result<Value> {
        trace!(name = %self.name, "Creating instance");

        let mut value = (self.factory)()?;

        // Snapshot, so extenders may register further extenders.
        let extenders = self.extenders.read().clone();
        for extender in &extenders {
            if let Some(replacement) = extender.apply(&mut value)? {
                value = replacement;
            }
        }

        Ok(value)
    }
}

/// A named factory, its scope and its extension chain.
///
/// Created by [`Module::export`](crate::module::Module::export) and
/// shared as `Arc<Export>`.
pub struct Export {
    core: Arc<Core>,
    scope: Scope,
    getter: Accessor,
    substitutes: RwLock<Vec<(u64, Producer)>>,
    instantiated: AtomicBool,
}

impl Export {
    /// Creates an export. The scoped getter is bound here, once.
    pub fn new(name: impl Into<String>, factory: Factory, scope: Scope) -> Self {
        let core = Arc::new(Core {
            name: name.into(),
            factory,
            extenders: RwLock::new(Vec::new()),
        });

        let getter = {
            let core = core.clone();
            scope.wrap(Arc::new(move || core.construct().map(Instance::from)))
        };

        Self {
            core,
            scope,
            getter,
            substitutes: RwLock::new(Vec::new()),
            instantiated: AtomicBool::new(false),
        }
    }

    /// Returns the scope-managed instance.
    ///
    /// While a [`Substitution`] is active, returns the substitute's
    /// instance instead and leaves the scope untouched.
    pub fn call(&self) -> Result<Instance> {
        let _guard = resolution::enter(&self.core.name)?;

        if let Some(substitute) = self.active_substitute() {
            trace!(name = %self.core.name, "Resolving substitute");
            return substitute();
        }

        trace!(name = %self.core.name, scope = %self.scope, "Resolving");
        let instance = (self.getter)()?;
        self.instantiated.store(true, Ordering::Release);
        Ok(instance)
    }

    /// Typed [`call`](Export::call).
    ///
    /// # Errors
    /// [`RequireError::TypeMismatch`] if the instance is not a `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.call()?
            .downcast::<T>()
            .map_err(|_| RequireError::type_mismatch::<T>(&self.core.name))
    }

    /// Creates a new instance, bypassing the scope.
    ///
    /// Runs the factory and every extender in registration order.
    pub fn create(&self) -> Result<Instance> {
        let _guard = resolution::enter(&self.core.name)?;

        if let Some(substitute) = self.active_substitute() {
            return substitute();
        }

        self.core.construct().map(Instance::from)
    }

    /// Appends an extender.
    ///
    /// A cached instance that already exists is not affected; only
    /// instances created afterwards see the new extender.
    pub fn extend(&self, extender: Extender) {
        let mut extenders = self.core.extenders.write();
        extenders.push(extender);
        debug!(
            name = %self.core.name,
            extenders = extenders.len(),
            "Extended export"
        );
    }

    /// Replaces the creation path until the returned guard is dropped.
    ///
    /// Substitutions stack: the most recent active one wins. Dropping a
    /// guard removes only its own substitute, in any order.
    pub fn substitute(self: &Arc<Self>, producer: Producer) -> Substitution {
        let id = NEXT_SUBSTITUTION.fetch_add(1, Ordering::Relaxed);
        let mut substitutes = self.substitutes.write();
        substitutes.push((id, producer));
        debug!(name = %self.core.name, active = substitutes.len(), "Installed substitute");

        Substitution {
            export: self.clone(),
            id,
        }
    }

    fn active_substitute(&self) -> Option<Producer> {
        self.substitutes.read().last().map(|(_, producer)| producer.clone())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    #[inline]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The factory as registered, with requirements bound.
    #[inline]
    pub fn factory(&self) -> &Factory {
        &self.core.factory
    }

    pub fn extender_count(&self) -> usize {
        self.core.extenders.read().len()
    }

    /// Returns `true` once the scoped getter produced an instance.
    pub fn is_instantiated(&self) -> bool {
        self.instantiated.load(Ordering::Acquire)
    }

    pub fn is_substituted(&self) -> bool {
        !self.substitutes.read().is_empty()
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Export")
            .field("name", &self.core.name)
            .field("scope", &self.scope)
            .field("extenders", &self.extender_count())
            .field("instantiated", &self.is_instantiated())
            .finish()
    }
}

/// Active replacement of an export's creation path.
///
/// Removes its substitute when dropped.
#[must_use = "the substitution is undone as soon as the guard is dropped"]
pub struct Substitution {
    export: Arc<Export>,
    id: u64,
}

impl Substitution {
    pub fn export(&self) -> &Arc<Export> {
        &self.export
    }
}

impl Drop for Substitution {
    fn drop(&mut self) {
        let mut substitutes = self.export.substitutes.write();
        substitutes.retain(|(id, _)| *id != self.id);
        debug!(
            name = %self.export.name(),
            active = substitutes.len(),
            "Removed substitute"
        );
    }
}

impl fmt::Debug for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Substitution")
            .field("export", &self.export.name())
            .field("id", &self.id)
            .finish()
    }
}
