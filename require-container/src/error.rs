//! Error types for require operations.
//!
//! Every failure is synchronous and surfaces at the call site that
//! triggered registration or resolution. Errors raised by user factories
//! and extenders are handed back exactly as they were returned.

use std::fmt;

use require_support::rendering::{render_chain, shorten_type_name};

/// Boxed error used as the source of user-reported failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all require operations.
#[derive(Debug, thiserror::Error)]
pub enum RequireError {
    /// Requested export was never registered.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// An export with the same name is already registered.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// A resolved value does not have the requested type.
    #[error("Type mismatch for {name:?}: expected {expected}")]
    TypeMismatch { name: String, expected: String },

    /// `inject` was called with both or neither of its argument modes.
    #[error(
        "Invalid injection: pass either a single requirement or named requirements, not both or neither"
    )]
    InvalidInjection,

    /// A keyword argument was read but neither supplied nor injected.
    #[error("Missing keyword argument: {name:?}")]
    MissingArgument { name: String },

    /// Resolving an export ended up requiring itself.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// Extension of an already instantiated cached export was rejected.
    #[error(
        "Export {name:?} is already instantiated; extending it would not affect the cached instance"
    )]
    LateExtension { name: String },

    /// A factory or extender failed to build its value.
    #[error("Failed to construct {name:?}: {source}")]
    ConstructionFailed {
        name: String,
        #[source]
        source: BoxError,
    },
}

impl RequireError {
    /// Reports a failure from inside a factory or extender.
    pub fn construction(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        RequireError::ConstructionFailed {
            name: name.into(),
            source: source.into(),
        }
    }

    pub(crate) fn type_mismatch<T: ?Sized>(name: &str) -> Self {
        RequireError::TypeMismatch {
            name: name.to_string(),
            expected: shorten_type_name(std::any::type_name::<T>()),
        }
    }
}

/// Error when an export was not registered.
///
/// Includes registered names that look similar to the requested one.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The requirement that was requested
    pub requested: String,
    /// Similar names that ARE registered
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown requirement: {}", self.requested)?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Exports must be registered before they are required"
        )
    }
}

/// Error when trying to register an export name that already exists.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub name: String,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Export already exists: {}", self.name)?;
        write!(
            f,
            "\n  Hint: Use .extend() to modify an existing export, or choose another name"
        )
    }
}

/// Error when a resolution cycle is detected.
///
/// Shows the full requirement chain so you can see WHERE the cycle is.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Example: ["a", "b", "a"]
    pub chain: Vec<String>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  ")?;
        write!(f, "{}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: An export (or one of its extenders) requires itself"
        )
    }
}

/// Convenient Result type for require operations.
pub type Result<T> = std::result::Result<T, RequireError>;
