//! Test doubles for exports.
//!
//! [`mock`] loads an export and prepares a replacement for it. While a
//! mocked function runs, every resolution of that export (through
//! [`Export::call`], [`Export::create`] or injection) yields the test
//! double instead of the real instance. The real creation path is
//! restored afterwards, also when the function panics.
//!
//! ```rust
//! use require_container::prelude::*;
//!
//! #[derive(Default)]
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! let module = Module::new();
//! module
//!     .export(ExportOptions::named("greeter"), |_| {
//!         Ok(Greeter { greeting: "hello".into() })
//!     })
//!     .unwrap();
//!
//! let mocked = mock(&module, "greeter")
//!     .unwrap()
//!     .with(|greeter: &mut Greeter| greeter.greeting = "mocked".into());
//!
//! let greeter = module.property("greeter").unwrap();
//! mocked.run(|| {
//!     assert_eq!(greeter.get::<Greeter>().unwrap().greeting, "mocked");
//! });
//! assert_eq!(greeter.get::<Greeter>().unwrap().greeting, "hello");
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::export::Export;
use crate::module::Module;
use crate::scope::{Instance, Producer};

type MakeFn = Arc<dyn Fn() -> Instance + Send + Sync>;

/// Prepares a test double for the export fulfilling `requirement`.
///
/// # Errors
/// [`RequireError::NotRegistered`](crate::error::RequireError::NotRegistered)
/// if no export has that name.
pub fn mock(module: &Module, requirement: &str) -> Result<Mock> {
    Ok(Mock {
        export: module.load(requirement)?,
    })
}

/// An export selected for mocking, waiting for its double.
#[derive(Debug, Clone)]
pub struct Mock {
    export: Arc<Export>,
}

impl Mock {
    /// Uses the value returned by `mocker` as double.
    pub fn returning<T, F>(self, mocker: F) -> Mocked
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Mocked {
            export: self.export,
            make: Arc::new(move || Arc::new(mocker()) as Instance),
        }
    }

    /// Uses a default `T`, adjusted by `configure`, as double.
    pub fn with<T, F>(self, configure: F) -> Mocked
    where
        T: Any + Default + Send + Sync,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.returning(move || {
            let mut double = T::default();
            configure(&mut double);
            double
        })
    }

    pub fn export(&self) -> &Arc<Export> {
        &self.export
    }
}

/// A mock ready to be applied.
///
/// Every [`run`](Mocked::run) creates one fresh double, shared by all
/// resolutions during that run.
#[derive(Clone)]
pub struct Mocked {
    export: Arc<Export>,
    make: MakeFn,
}

impl Mocked {
    /// Runs `f` with the export replaced by a fresh double.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let double = (self.make)();
        let producer: Producer = Arc::new(move || Ok(double.clone()));

        debug!(name = %self.export.name(), "Mocking export");
        let _substitution = self.export.substitute(producer);
        f()
    }

    /// Wraps `func` so each call runs with the export mocked.
    pub fn decorate<A, R, F>(&self, func: F) -> impl Fn(A) -> R + use<A, R, F>
    where
        F: Fn(A) -> R,
    {
        let mocked = self.clone();
        move |args| mocked.run(|| func(args))
    }

    pub fn export(&self) -> &Arc<Export> {
        &self.export
    }
}

impl fmt::Debug for Mocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mocked({})", self.export.name())
    }
}
