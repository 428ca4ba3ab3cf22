//! Preset backends.

pub use burn::{
    backend::{wgpu::WgpuDevice, Autodiff, Wgpu},
    tensor::backend::{AutodiffBackend, Backend},
};

/// The backend of training on GPU.
pub type WgpuAutodiff = Autodiff<Wgpu>;
