//! # Modules
//!
//! A [`Module`] is a registry of named exports plus the operations to
//! register, extend, resolve and inject them.
//!
//! # Architecture
//! ```text
//! Module::builder() ──build()──> Module
//!                                  │
//!            export() / extend() / extend_with()    (startup)
//!                                  │
//!              load() / wrap() / inject()           (runtime)
//!                                  │
//!                                  ▼
//!                           Arc<Export> ──call()──> Instance
//! ```
//!
//! # Examples
//! ```rust
//! use require_container::prelude::*;
//!
//! let module = Module::new();
//!
//! module
//!     .export(ExportOptions::named("export"), |_| Ok(String::from("test")))
//!     .unwrap();
//!
//! module
//!     .extend("export", Requirements::new(), |s: &mut String, _: &Kwargs| {
//!         Ok(Some(format!("{s}!")))
//!     })
//!     .unwrap();
//!
//! let export = module.load("export").unwrap();
//! assert_eq!(*export.get::<String>().unwrap(), "test!");
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use require_support::rendering::{qualified_name, suggest_similar};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{NotRegisteredError, RequireError, Result};
use crate::export::{Export, Extender, Factory, Value};
use crate::inject::{Binder, InjectProperty, Injected, Injection, Kwargs, Requirements};
use crate::registry::Registry;
use crate::scope::Scope;

const MAX_SUGGESTIONS: usize = 3;

// ============================================================
// Settings
// ============================================================

/// What happens when a cached export is extended after it was
/// instantiated.
///
/// The cached instance never changes; only instances created afterwards
/// (via [`Export::create`] or non-caching scopes) see the new extender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LateExtension {
    /// Extend silently.
    Allow,
    /// Extend and log a warning.
    #[default]
    Warn,
    /// Fail with [`RequireError::LateExtension`].
    Reject,
}

/// Module configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSettings {
    /// Shown in log events to tell modules apart.
    pub label: String,
    pub late_extension: LateExtension,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            label: "default".to_string(),
            late_extension: LateExtension::default(),
        }
    }
}

/// Builds a [`Module`] with custom settings.
///
/// # Examples
/// ```rust
/// use require_container::module::{LateExtension, Module};
///
/// let module = Module::builder()
///     .label("tests")
///     .late_extension(LateExtension::Reject)
///     .build();
/// assert_eq!(module.settings().label, "tests");
/// ```
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    settings: ModuleSettings,
}

impl ModuleBuilder {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.settings.label = label.into();
        self
    }

    pub fn late_extension(mut self, policy: LateExtension) -> Self {
        self.settings.late_extension = policy;
        self
    }

    pub fn build(self) -> Module {
        debug!(label = %self.settings.label, "Building module");
        Module {
            registry: Registry::new(),
            settings: self.settings,
        }
    }
}

// ============================================================
// Export options
// ============================================================

/// Registration options for [`Module::export`].
///
/// Defaults: auto-generated name, singleton scope, no requirements.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    name: Option<String>,
    scope: Scope,
    requirements: Requirements,
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with an explicit export name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().name(name)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Injects the export `requirement` as keyword argument `argument`.
    pub fn require(mut self, argument: impl Into<String>, requirement: impl Into<String>) -> Self {
        self.requirements = self.requirements.require(argument, requirement);
        self
    }

    pub fn requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }
}

/// Snapshot of one export, as returned by [`Module::describe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportInfo {
    pub name: String,
    pub scope: String,
    pub extenders: usize,
    pub instantiated: bool,
}

// ═══════════════════════════════════════════
// Module
// ═══════════════════════════════════════════

/// Registry of named exports.
///
/// Modules are independent: tests can build their own instead of
/// sharing an application-wide one.
pub struct Module {
    registry: Registry,
    settings: ModuleSettings,
}

impl Module {
    /// Creates a module with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ModuleBuilder {
        ModuleBuilder::default()
    }

    pub fn settings(&self) -> &ModuleSettings {
        &self.settings
    }

    /// Loads the export fulfilling `requirement`.
    ///
    /// # Errors
    /// [`RequireError::NotRegistered`] if no export has that name.
    pub fn load(&self, requirement: &str) -> Result<Arc<Export>> {
        self.registry.get(requirement).ok_or_else(|| {
            RequireError::NotRegistered(NotRegisteredError {
                requested: requirement.to_string(),
                suggestions: self.find_suggestions(requirement),
            })
        })
    }

    /// Registers `factory` as a new export.
    ///
    /// Requirements listed in `options` are loaded now and injected into
    /// the factory's keyword arguments on every creation. Without an
    /// explicit name, the export is named after the factory's path, e.g.
    /// `my_app::db:connect` for a function `my_app::db::connect`.
    ///
    /// # Errors
    /// - [`RequireError::NotRegistered`] — a requirement is unknown
    /// - [`RequireError::AlreadyRegistered`] — the name is taken
    pub fn export<T, F>(&self, options: ExportOptions, factory: F) -> Result<Arc<Export>>
    where
        T: Any + Send + Sync,
        F: Fn(&Kwargs) -> Result<T> + Send + Sync + 'static,
    {
        let ExportOptions {
            name,
            scope,
            requirements,
        } = options;

        let name = name.unwrap_or_else(|| qualified_name(type_name::<F>()));
        let injected = Injected::new(
            move |_: (), kwargs: &Kwargs| factory(kwargs),
            self.load_requirements(&requirements)?,
        );

        let factory: Factory = Arc::new(move || {
            injected
                .call(())
                .map(|instance| Box::new(instance) as Value)
        });

        let export = Arc::new(Export::new(name, factory, scope));
        self.registry.register(export.clone())?;

        debug!(
            module = %self.settings.label,
            name = %export.name(),
            scope = %export.scope(),
            "Registered export"
        );
        Ok(export)
    }

    /// Extends the export fulfilling `requirement`.
    ///
    /// `extender` receives each freshly created instance and the keyword
    /// arguments for its own `requirements`. Returning `Some` replaces the
    /// instance; `None` keeps it, including in-place changes.
    pub fn extend<T, F>(&self, requirement: &str, requirements: Requirements, extender: F) -> Result<()>
    where
        T: Any + Send + Sync,
        F: Fn(&mut T, &Kwargs) -> Result<Option<T>> + Send + Sync + 'static,
    {
        let target = self.load(requirement)?;
        self.check_late_extension(&target)?;

        let injected = Injected::new(extender, self.load_requirements(&requirements)?);
        target.extend(Extender::typed(target.name(), move |value: &mut T| {
            injected.call(value)
        }));
        Ok(())
    }

    /// Extends the export fulfilling `requirement` with the instance of
    /// the export `source`, which must be an
    /// [`Extension<T>`](crate::export::Extension).
    ///
    /// The source is resolved through its own scope whenever the target
    /// creates an instance.
    pub fn extend_with<T>(&self, requirement: &str, source: &str) -> Result<()>
    where
        T: Any + Send + Sync,
    {
        let target = self.load(requirement)?;
        let source = self.load(source)?;
        self.check_late_extension(&target)?;

        debug!(
            module = %self.settings.label,
            name = %target.name(),
            source = %source.name(),
            "Extending export with export"
        );
        target.extend(Extender::export::<T>(target.name(), source));
        Ok(())
    }

    /// Wraps `func` for injecting `requirements`.
    ///
    /// All requirements are loaded now; instances are resolved on every
    /// call for the keyword arguments the caller did not supply.
    pub fn wrap<A, R, F>(&self, func: F, requirements: Requirements) -> Result<Injected<F>>
    where
        F: Fn(A, &Kwargs) -> Result<R>,
    {
        Ok(Injected::new(func, self.load_requirements(&requirements)?))
    }

    /// Creates an injection in one of two modes.
    ///
    /// - `Some(requirement)` with no named requirements returns an
    ///   [`Injection::Property`] accessor for that export.
    /// - `None` with named requirements returns an [`Injection::Binder`]
    ///   wrapping functions like [`wrap`](Module::wrap).
    ///
    /// # Errors
    /// [`RequireError::InvalidInjection`] if both or neither are given.
    pub fn inject(&self, requirement: Option<&str>, requirements: Requirements) -> Result<Injection> {
        match (requirement, requirements.is_empty()) {
            (Some(requirement), true) => {
                Ok(Injection::Property(InjectProperty::new(self.load(requirement)?)))
            }
            (None, false) => Ok(Injection::Binder(Binder::new(
                self.load_requirements(&requirements)?,
            ))),
            _ => Err(RequireError::InvalidInjection),
        }
    }

    /// Shorthand for a single-requirement [`inject`](Module::inject).
    pub fn property(&self, requirement: &str) -> Result<InjectProperty> {
        Ok(InjectProperty::new(self.load(requirement)?))
    }

    /// Describes all exports, sorted by name.
    pub fn describe(&self) -> Vec<ExportInfo> {
        self.registry
            .exports()
            .iter()
            .map(|export| ExportInfo {
                name: export.name().to_string(),
                scope: export.scope().name().to_string(),
                extenders: export.extender_count(),
                instantiated: export.is_instantiated(),
            })
            .collect()
    }

    pub fn contains(&self, requirement: &str) -> bool {
        self.registry.contains(requirement)
    }

    /// Returns all registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.len() == 0
    }

    // ── Internal ──

    fn load_requirements(&self, requirements: &Requirements) -> Result<Vec<(String, Arc<Export>)>> {
        requirements
            .iter()
            .map(|(argument, requirement)| Ok((argument.to_string(), self.load(requirement)?)))
            .collect()
    }

    fn check_late_extension(&self, export: &Export) -> Result<()> {
        if !(export.scope().is_cached() && export.is_instantiated()) {
            return Ok(());
        }

        match self.settings.late_extension {
            LateExtension::Allow => Ok(()),
            LateExtension::Warn => {
                warn!(
                    module = %self.settings.label,
                    name = %export.name(),
                    "Extending an instantiated export; the cached instance is not affected"
                );
                Ok(())
            }
            LateExtension::Reject => Err(RequireError::LateExtension {
                name: export.name().to_string(),
            }),
        }
    }

    fn find_suggestions(&self, requirement: &str) -> Vec<String> {
        let names = self.registry.names();
        let available: Vec<&str> = names.iter().map(String::as_str).collect();
        suggest_similar(requirement, &available, MAX_SUGGESTIONS)
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("label", &self.settings.label)
            .field("registered", &self.registry.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{ExportInfo, ExportOptions, LateExtension, Module, ModuleBuilder};
    pub use crate::error::{RequireError, Result};
    pub use crate::export::{Export, Extension, Extender};
    pub use crate::inject::{InjectProperty, Injected, Injection, Kwargs, Requirements};
    #[cfg(feature = "mock")]
    pub use crate::mock::mock;
    pub use crate::provider::Provider;
    pub use crate::scope::{Instance, Scope};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
