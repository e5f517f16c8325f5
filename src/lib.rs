//! Workspace facade crate.
//!
//! Host applications can depend on `photo-manager-workspace` instead of
//! wiring the individual crates themselves: the core crates are re-exported
//! under stable names, and the `desktop` feature (on by default) pulls in
//! the desktop bridge implementations.

pub use bridge_traits as bridge;
pub use core_auth as auth;
pub use core_metadata as metadata;
pub use core_runtime as runtime;
pub use core_sync as sync;

#[cfg(feature = "desktop")]
pub use bridge_desktop as desktop;
