//! Requirement injection.
//!
//! Functions receive their requirements as named keyword arguments
//! ([`Kwargs`]). Wrapping a function with [`Module::wrap`] produces an
//! [`Injected`] function which resolves every requirement the caller did
//! not supply itself:
//!
//! ```rust
//! use require_container::prelude::*;
//!
//! let module = Module::new();
//! module
//!     .export(ExportOptions::named("greeting"), |_| Ok(String::from("hello")))
//!     .unwrap();
//!
//! let greet = module
//!     .wrap(
//!         |name: &str, kwargs: &Kwargs| {
//!             let greeting = kwargs.get::<String>("greeting")?;
//!             Ok(format!("{greeting}, {name}"))
//!         },
//!         Requirements::new().require("greeting", "greeting"),
//!     )
//!     .unwrap();
//!
//! assert_eq!(greet.call("world").unwrap(), "hello, world");
//!
//! // Caller-supplied keyword arguments win over injected ones.
//! let kwargs = Kwargs::new().with("greeting", String::from("bye"));
//! assert_eq!(greet.call_with("world", kwargs).unwrap(), "bye, world");
//! ```
//!
//! [`Module::wrap`]: crate::module::Module::wrap

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::{RequireError, Result};
use crate::export::Export;
use crate::scope::Instance;

/// Maps keyword argument names to requirement names.
///
/// # Examples
/// ```
/// use require_container::inject::Requirements;
///
/// let requirements = Requirements::new()
///     .require("db", "database")
///     .require("log", "logger");
/// assert_eq!(requirements.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    entries: Vec<(String, String)>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects the export `requirement` as keyword argument `argument`.
    ///
    /// Requiring the same argument twice keeps the last requirement.
    pub fn require(mut self, argument: impl Into<String>, requirement: impl Into<String>) -> Self {
        let argument = argument.into();
        let requirement = requirement.into();

        match self.entries.iter_mut().find(|(name, _)| *name == argument) {
            Some(entry) => entry.1 = requirement,
            None => self.entries.push((argument, requirement)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates `(argument, requirement)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(argument, requirement)| (argument.as_str(), requirement.as_str()))
    }
}

impl<A, R> FromIterator<(A, R)> for Requirements
where
    A: Into<String>,
    R: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (A, R)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Requirements::new(), |requirements, (argument, requirement)| {
                requirements.require(argument, requirement)
            })
    }
}

/// Keyword arguments passed to injected functions.
#[derive(Clone, Default)]
pub struct Kwargs {
    values: HashMap<String, Instance>,
}

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a caller-supplied argument.
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.insert_instance(name, Arc::new(value));
    }

    pub fn insert_instance(&mut self, name: impl Into<String>, instance: Instance) {
        self.values.insert(name.into(), instance);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.values.get(name)
    }

    /// Typed access to an argument.
    ///
    /// # Errors
    /// - [`RequireError::MissingArgument`] — the argument is absent
    /// - [`RequireError::TypeMismatch`] — the argument is not a `T`
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let instance = self
            .values
            .get(name)
            .ok_or_else(|| RequireError::MissingArgument {
                name: name.to_string(),
            })?;

        instance
            .clone()
            .downcast::<T>()
            .map_err(|_| RequireError::type_mismatch::<T>(name))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Kwargs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_tuple("Kwargs").field(&names).finish()
    }
}

/// A function whose requirements are injected on every call.
///
/// Created by [`Module::wrap`](crate::module::Module::wrap) or
/// [`Binder::wrap`]. The wrapped function receives its positional
/// argument unchanged and the keyword arguments with every missing
/// requirement filled in.
pub struct Injected<F> {
    func: F,
    exports: Vec<(String, Arc<Export>)>,
}

impl<F> Injected<F> {
    pub(crate) fn new(func: F, exports: Vec<(String, Arc<Export>)>) -> Self {
        Self { func, exports }
    }

    /// Calls the function with all requirements injected.
    pub fn call<A, R>(&self, args: A) -> Result<R>
    where
        F: Fn(A, &Kwargs) -> Result<R>,
    {
        self.call_with(args, Kwargs::new())
    }

    /// Calls the function, injecting only requirements missing from `kwargs`.
    ///
    /// Requirements supplied by the caller are never resolved.
    pub fn call_with<A, R>(&self, args: A, mut kwargs: Kwargs) -> Result<R>
    where
        F: Fn(A, &Kwargs) -> Result<R>,
    {
        self.resolve_into(&mut kwargs)?;
        (self.func)(args, &kwargs)
    }

    /// Resolves every requirement not already present in `kwargs`.
    pub fn resolve_into(&self, kwargs: &mut Kwargs) -> Result<()> {
        for (argument, export) in &self.exports {
            if kwargs.contains(argument) {
                trace!(argument = %argument, "Keeping caller-supplied argument");
                continue;
            }
            kwargs.insert_instance(argument.clone(), export.call()?);
        }
        Ok(())
    }

    /// The wrapped function.
    pub fn inner(&self) -> &F {
        &self.func
    }

    /// Iterates `(argument, export)` pairs.
    pub fn requirements(&self) -> impl Iterator<Item = (&str, &Arc<Export>)> {
        self.exports
            .iter()
            .map(|(argument, export)| (argument.as_str(), export))
    }
}

impl<F> fmt::Debug for Injected<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for (argument, export) in &self.exports {
            list.entry(argument, &export.name());
        }
        list.finish()
    }
}

/// Accessor for a single requirement.
///
/// [`get`](InjectProperty::get) resolves the scoped instance, while
/// [`export`](InjectProperty::export) hands out the export itself for
/// introspection.
#[derive(Clone)]
pub struct InjectProperty {
    export: Arc<Export>,
}

impl InjectProperty {
    pub(crate) fn new(export: Arc<Export>) -> Self {
        Self { export }
    }

    /// Resolves the scoped instance as `T`.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.export.get::<T>()
    }

    /// Resolves the scoped instance, untyped.
    pub fn value(&self) -> Result<Instance> {
        self.export.call()
    }

    pub fn export(&self) -> &Arc<Export> {
        &self.export
    }
}

impl fmt::Debug for InjectProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InjectProperty({})", self.export.name())
    }
}

/// Loaded named requirements, ready to wrap functions.
#[derive(Clone)]
pub struct Binder {
    exports: Vec<(String, Arc<Export>)>,
}

impl Binder {
    pub(crate) fn new(exports: Vec<(String, Arc<Export>)>) -> Self {
        Self { exports }
    }

    /// Wraps `func` like [`Module::wrap`](crate::module::Module::wrap).
    pub fn wrap<F>(&self, func: F) -> Injected<F> {
        Injected::new(func, self.exports.clone())
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arguments: Vec<&str> = self.exports.iter().map(|(a, _)| a.as_str()).collect();
        f.debug_tuple("Binder").field(&arguments).finish()
    }
}

/// Result of [`Module::inject`](crate::module::Module::inject).
#[derive(Debug, Clone)]
pub enum Injection {
    /// A single unnamed requirement.
    Property(InjectProperty),
    /// Named requirements for wrapping functions.
    Binder(Binder),
}

impl Injection {
    pub fn into_property(self) -> Option<InjectProperty> {
        match self {
            Injection::Property(property) => Some(property),
            Injection::Binder(_) => None,
        }
    }

    pub fn into_binder(self) -> Option<Binder> {
        match self {
            Injection::Binder(binder) => Some(binder),
            Injection::Property(_) => None,
        }
    }
}
