//! # require — named exports and requirement injection for Rust
//!
//! Register factories as named exports in a [`Module`], decide per export
//! how long instances live, post-process new instances with extenders and
//! inject exports into functions by name.
//!
//! ```rust
//! use require::prelude::*;
//!
//! let module = Module::new();
//!
//! module
//!     .export(ExportOptions::named("config:url"), |_| {
//!         Ok(String::from("postgres://localhost"))
//!     })
//!     .unwrap();
//!
//! module
//!     .export(
//!         ExportOptions::named("db").require("url", "config:url"),
//!         |kwargs| Ok(format!("connected to {}", kwargs.get::<String>("url")?)),
//!     )
//!     .unwrap();
//!
//! let db = module.property("db").unwrap();
//! assert_eq!(*db.get::<String>().unwrap(), "connected to postgres://localhost");
//! ```

pub use require_container::*;
pub use require_support::rendering;
