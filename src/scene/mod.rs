//! Learned scene representations.

pub mod bbox;
pub mod field;
pub mod nerf;

pub use burn::{
    config::Config,
    module::{Ignored, Module, Param},
    tensor::{backend::Backend, Tensor, TensorData},
};
