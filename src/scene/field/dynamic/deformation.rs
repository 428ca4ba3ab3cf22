//! Deformation network.

pub use super::*;

use crate::error::Error;
use burn::nn::{Linear, LinearConfig};

/// The configuration for [`Deformation`].
#[derive(Config, Copy, Debug)]
pub struct DeformationConfig {
    /// Dimension of the encoded points.
    pub dim_position: usize,
    /// Dimension of the time features.
    pub dim_time: usize,
    /// Hidden width.
    #[config(default = 256)]
    pub width: usize,
    /// Number of linear layers, including the output layer.
    #[config(default = 3)]
    pub depth: usize,
}

/// Offsetting points by time.
///
/// `x + W_out * ReLU(... ReLU(W_0 * [enc(x), t] + B_0) ...) + B_out`
#[derive(Debug, Module)]
pub struct Deformation<B: Backend> {
    /// The hidden layers, each followed by a ReLU.
    pub layers: Vec<Linear<B>>,
    /// The offset layer.
    pub output: Linear<B>,
}

impl DeformationConfig {
    /// Initialize from the configuration.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<Deformation<B>, Error> {
        if self.depth < 2 {
            return Err(Error::Configuration(format!(
                "the deformation depth {} should be at least 2",
                self.depth
            )));
        }

        let mut layers = Vec::with_capacity(self.depth - 1);
        layers.push(LinearConfig::new(self.dim_position + self.dim_time, self.width).init(device));
        for _ in 0..self.depth - 2 {
            layers.push(LinearConfig::new(self.width, self.width).init(device));
        }
        let output = LinearConfig::new(self.width, 3).init(device);

        Ok(Deformation { layers, output })
    }
}

impl<B: Backend> Deformation<B> {
    /// Deforming the points.
    ///
    /// ## Shapes
    ///
    /// * `points` - `[N, 3]`
    /// * `points_encoded` - `[N, P]`
    /// * `times_encoded` - `[N, T]`
    /// * `output` - `[N, 3]`
    pub fn forward(
        &self,
        points: Tensor<B, 2>,
        points_encoded: Tensor<B, 2>,
        times_encoded: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let hidden = self.layers.iter().fold(
            Tensor::cat(vec![points_encoded, times_encoded], 1),
            |hidden, layer| burn::tensor::activation::relu(layer.forward(hidden)),
        );

        points + self.output.forward(hidden)
    }
}
