//! Ferrite runtime: the host-facing emulation loop.
//!
//! Owns a [`ferrite_core::Console`] behind a shared lock and drives it on a
//! dedicated worker thread paced to NTSC frame timing. Everything the host
//! does (reset, cartridge hot-swap, save states, input) goes through the
//! same lock, so nothing can interleave with an in-flight frame.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeError, RuntimeStatus};
