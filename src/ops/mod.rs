//! Update rules and their entry points.
//!
//! - [`cpu`] — the rules themselves, generic over [`crate::device::Device`] and [`crate::float::Float`]
//! - [`wgpu`] — the same rules as WGSL compute kernels (feature `wgpu`, `f32` only)
//! - [`dispatch`] — validated entry points on [`crate::tensors::Tensor`]s with backend selection
//! - [`registry`] — lookup of the entry points by operation name

pub mod cpu;
pub mod dispatch;
pub mod registry;

#[cfg(feature = "wgpu")]
pub mod wgpu;
