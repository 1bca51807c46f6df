//! Backend selection module.
//!
//! This module defines the available execution backends for the update rules
//! and provides functions to set and get the current backend.
//!
//! # Supported Backends
//!
//! - `Sequential` — single-threaded loop on the calling thread.
//! - `Cpu` — multi-threaded CPU execution through `rayon` (default).
//! - `Wgpu` — GPU compute shaders through `wgpu` (feature `wgpu`, `f32` only).
//!
//! The backend is stored globally using an `AtomicU8`, enabling fast
//! switching between modes at runtime. Every dispatch entry point also has an
//! `*_on` variant taking the backend explicitly, which bypasses the global.

use core::convert::TryFrom;
use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

/// Enumeration of supported execution backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Backend {
    /// One thread, no task splitting.
    Sequential = 0,
    /// Data-parallel CPU backend (default).
    #[default]
    Cpu,
    /// GPU-accelerated backend using `wgpu`; falls back to `Cpu` when unavailable.
    Wgpu,
}

impl TryFrom<u8> for Backend {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Sequential),
            1 => Ok(Self::Cpu),
            2 => Ok(Self::Wgpu),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sequential => "sequential",
            Self::Cpu => "cpu",
            Self::Wgpu => "wgpu",
        })
    }
}

/// Internal global state for the active backend.
///
/// The backend is expected to change rarely, never in the middle of a step.
static GLOBAL_DEFAULT_BACKEND: AtomicU8 = AtomicU8::new(Backend::Cpu as u8);

/// Sets the active backend used by the dispatch entry points.
///
/// # Example
///
/// ```
/// use briny_optim::backend::{get_backend, set_backend, Backend};
/// set_backend(Backend::Sequential);
/// assert_eq!(get_backend(), Backend::Sequential);
/// set_backend(Backend::Cpu);
/// ```
pub fn set_backend(b: Backend) {
    log::debug!("active backend set to {b}");
    GLOBAL_DEFAULT_BACKEND.store(b as u8, Ordering::Release);
}

/// Returns the currently active backend.
///
/// If the stored value is invalid, defaults to [`Backend::Cpu`].
pub fn get_backend() -> Backend {
    Backend::try_from(GLOBAL_DEFAULT_BACKEND.load(Ordering::Acquire)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        for b in [Backend::Sequential, Backend::Cpu, Backend::Wgpu] {
            assert_eq!(Backend::try_from(b as u8), Ok(b));
        }
        assert_eq!(Backend::try_from(9), Err(()));
    }

    #[test]
    fn default_is_cpu() {
        assert_eq!(Backend::default(), Backend::Cpu);
        assert_eq!(Backend::Wgpu.to_string(), "wgpu");
    }
}
