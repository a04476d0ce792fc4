//! Bebaby request-security primitives.
//!
//! Process-wide state that guards the admin surface: the CSRF token store,
//! the admin session store and the fixed-window rate limiters. Each type is
//! created once at startup, shared through the API state, swept on a timer
//! and stopped at shutdown.

pub mod csrf;
pub mod rate_limit;
pub mod sessions;
pub mod sweeper;
pub mod token;
