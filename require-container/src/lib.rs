//! Core of the require dependency injection framework.
//!
//! Exports are named factories living in a [`Module`]. Each export has a
//! [`Scope`] deciding whether its instance is reused, and a chain of
//! extenders post-processing every new instance. Functions declare the
//! exports they need as [`Requirements`] and get them injected as
//! keyword arguments.

pub mod error;
pub mod export;
pub mod inject;
#[cfg(feature = "mock")]
pub mod mock;
pub mod module;
pub mod provider;
pub(crate) mod registry;
mod resolution;
pub mod scope;

#[doc(hidden)]
pub use inventory;

pub use error::{RequireError, Result};
pub use export::{Export, Extender, Extension, Substitution};
pub use inject::{InjectProperty, Injected, Injection, Kwargs, Requirements};
pub use module::{ExportOptions, LateExtension, Module, prelude};
pub use provider::Provider;
pub use scope::{Instance, Scope};

/// Builds the name an export gets when registered without one.
///
/// Expands to the current module path joined with `name` by a single
/// colon, e.g. `my_app::db:connect` for a function `connect` exported
/// from `my_app::db`.
///
/// ```rust
/// let name = require_container::requirement!("connect");
/// assert_eq!(name, concat!(module_path!(), ":connect"));
/// ```
#[macro_export]
macro_rules! requirement {
    ($name:literal) => {
        concat!(module_path!(), ":", $name)
    };
}
