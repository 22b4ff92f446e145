//! Providers — groups of related registrations.
//!
//! A provider registers the exports of one part of an application into a
//! [`Module`]. Providers can be added by hand, or submitted at link time
//! with [`register_provider!`](crate::register_provider) and installed in
//! one go by [`Module::install_registered`].
//!
//! # Examples
//! ```rust
//! use require_container::prelude::*;
//!
//! struct ConfigProvider;
//!
//! impl Provider for ConfigProvider {
//!     fn register(&self, module: &Module) -> Result<()> {
//!         module.export(ExportOptions::named("config:url"), |_| {
//!             Ok(String::from("postgres://localhost"))
//!         })?;
//!         Ok(())
//!     }
//! }
//!
//! let module = Module::new();
//! module.add_provider(&ConfigProvider).unwrap();
//! assert!(module.contains("config:url"));
//! ```

use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::module::Module;

/// Registers related exports into a module.
pub trait Provider: Send + Sync {
    /// Registers this provider's exports and extenders.
    ///
    /// Called once per module.
    fn register(&self, module: &Module) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A provider submitted for automatic installation.
///
/// Created by [`register_provider!`](crate::register_provider). Lower
/// `order` values are installed first; equal orders are installed by
/// provider name.
pub struct ProviderRegistration {
    provider: &'static dyn Provider,
    order: i32,
}

impl ProviderRegistration {
    pub const fn new(provider: &'static dyn Provider) -> Self {
        Self { provider, order: 0 }
    }

    pub const fn with_order(provider: &'static dyn Provider, order: i32) -> Self {
        Self { provider, order }
    }

    pub fn provider(&self) -> &'static dyn Provider {
        self.provider
    }

    pub fn order(&self) -> i32 {
        self.order
    }
}

inventory::collect!(ProviderRegistration);

/// Submits a provider for [`Module::install_registered`].
///
/// The provider must be a constant expression, typically a unit struct.
///
/// ```rust,ignore
/// struct DatabaseProvider;
/// impl Provider for DatabaseProvider { /* ... */ }
///
/// require_container::register_provider!(DatabaseProvider);
/// require_container::register_provider!(DatabaseProvider, order = -10);
/// ```
#[macro_export]
macro_rules! register_provider {
    ($provider:expr, order = $order:expr) => {
        $crate::inventory::submit! {
            $crate::provider::ProviderRegistration::with_order(&$provider, $order)
        }
    };
    ($provider:expr) => {
        $crate::inventory::submit! {
            $crate::provider::ProviderRegistration::new(&$provider)
        }
    };
}

impl Module {
    /// Lets `provider` register its exports.
    #[instrument(skip_all, fields(provider = provider.name()))]
    pub fn add_provider(&self, provider: &dyn Provider) -> Result<()> {
        let before = self.len();
        provider.register(self)?;
        debug!(exports = self.len() - before, "Provider registered");
        Ok(())
    }

    /// Installs every provider submitted with
    /// [`register_provider!`](crate::register_provider).
    ///
    /// Returns the number of installed providers. Stops at the first
    /// provider that fails.
    #[instrument(skip_all, fields(module = %self.settings().label))]
    pub fn install_registered(&self) -> Result<usize> {
        let mut registrations: Vec<&ProviderRegistration> =
            inventory::iter::<ProviderRegistration>.into_iter().collect();
        registrations.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| a.provider.name().cmp(b.provider.name()))
        });

        for registration in &registrations {
            self.add_provider(registration.provider)?;
        }

        info!(providers = registrations.len(), "Installed registered providers");
        Ok(registrations.len())
    }
}
