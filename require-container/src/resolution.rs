//! Resolution-time cycle detection.
//!
//! Requirements are loaded eagerly when an export or extender is
//! registered, so a requirement graph can only become cyclic through
//! extenders added later. Such a cycle would re-enter a singleton cell
//! while it is being initialized. Instead, every resolution pushes the
//! export name onto a per-thread path and fails if the name is already
//! on it.

use std::cell::RefCell;

use tracing::warn;

use crate::error::{CircularDependencyError, RequireError, Result};

thread_local! {
    static PATH: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Marks an export as being resolved on the current thread.
///
/// Dropping the guard removes the export from the path again, on every
/// exit path including unwinding.
#[must_use]
pub(crate) struct ResolutionGuard {
    depth: usize,
}

/// Enters the resolution of `name`.
///
/// # Errors
/// [`RequireError::CircularDependency`] if `name` is already being
/// resolved further up the current call stack.
pub(crate) fn enter(name: &str) -> Result<ResolutionGuard> {
    PATH.with(|path| {
        let mut path = path.borrow_mut();

        if let Some(start) = path.iter().position(|entry| entry == name) {
            let mut chain: Vec<String> = path[start..].to_vec();
            chain.push(name.to_string());

            warn!(cycle = ?chain, "Circular dependency detected!");

            return Err(RequireError::CircularDependency(
                CircularDependencyError { chain },
            ));
        }

        path.push(name.to_string());
        Ok(ResolutionGuard { depth: path.len() })
    })
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        PATH.with(|path| {
            path.borrow_mut().truncate(self.depth - 1);
        });
    }
}

/// Returns the names currently being resolved on this thread.
#[cfg(test)]
pub(crate) fn current_path() -> Vec<String> {
    PATH.with(|path| path.borrow().clone())
}
