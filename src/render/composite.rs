//! Volumetric compositing.

pub use burn::{
    config::Config,
    tensor::{backend::Backend, Distribution, Tensor},
};

use crate::{
    function::TensorFloatExtension,
    preset::render::{DISPARITY_EPSILON, DISTANCE_FAR, TRANSMITTANCE_EPSILON},
};
use burn::tensor::activation;

/// The activation applied to the raw colors.
#[derive(Config, Copy, Debug, PartialEq, Eq)]
pub enum ColorActivation {
    Sigmoid,
    Relu,
    Identity,
}

/// The composited values of rays.
#[derive(Clone, Debug)]
pub struct Composite<B: Backend> {
    /// `[R, 3]`
    pub rgb: Tensor<B, 2>,
    /// `[R]`
    pub disp: Tensor<B, 1>,
    /// `[R]`
    pub acc: Tensor<B, 1>,
    /// `[R, S]`
    pub weights: Tensor<B, 2>,
    /// `[R]`
    pub depth: Tensor<B, 1>,
}

impl ColorActivation {
    pub fn forward<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
    ) -> Tensor<B, D> {
        match self {
            Self::Sigmoid => activation::sigmoid(input),
            Self::Relu => activation::relu(input),
            Self::Identity => input,
        }
    }
}

/// Alpha compositing of raw samples along rays.
///
/// ## Details
///
/// * `delta_i = (z_(i+1) - z_i) * |d|`, and the last one is [`DISTANCE_FAR`].
/// * `sigma_i = ReLU(raw_i + noise_i)`
/// * `alpha_i = 1 - exp(-sigma_i * delta_i)`
/// * `w_i = alpha_i * prod_(j < i) (1 - alpha_j + eps)`
///
/// ## Shapes
///
/// * `raw` - `[R, S, 4]`
/// * `depths` - `[R, S]`
/// * `directions` - `[R, 3]`
pub fn composite<B: Backend>(
    raw: Tensor<B, 3>,
    depths: Tensor<B, 2>,
    directions: Tensor<B, 2>,
    raw_noise_std: f32,
    color_activation: ColorActivation,
) -> Composite<B> {
    let device = raw.device();
    let [ray_count, sample_count, _] = raw.dims();

    // [R, S]
    let distances = Tensor::cat(
        vec![
            depths.to_owned().slice([0..ray_count, 1..sample_count])
                - depths.to_owned().slice([0..ray_count, 0..sample_count - 1]),
            Tensor::ones([ray_count, 1], &device).mul_scalar(DISTANCE_FAR),
        ],
        1,
    ) * directions.powf_scalar(2.0).sum_dim(1).sqrt();

    // [R, S]
    let mut densities = raw
        .to_owned()
        .slice([0..ray_count, 0..sample_count, 3..4])
        .reshape([ray_count, sample_count]);
    if raw_noise_std > 0.0 {
        densities = densities
            + Tensor::random(
                [ray_count, sample_count],
                Distribution::Normal(0.0, raw_noise_std as f64),
                &device,
            );
    }
    let densities = activation::relu(densities);

    // [R, S]
    let alphas = (densities.neg() * distances).exp().neg().add_scalar(1.0);
    let transmittances = alphas
        .to_owned()
        .neg()
        .add_scalar(1.0)
        .add_scalar(TRANSMITTANCE_EPSILON)
        .prod_cumulative_exclusive(1);
    let weights = alphas * transmittances;

    // [R, S, 3]
    let colors = color_activation.forward(raw.slice([0..ray_count, 0..sample_count, 0..3]));
    // [R, 3]
    let rgb = (colors * weights.to_owned().reshape([ray_count, sample_count, 1]))
        .sum_dim(1)
        .reshape([ray_count, 3]);
    // [R]
    let depth = (weights.to_owned() * depths).sum_dim(1).reshape([ray_count]);
    let acc = weights.to_owned().sum_dim(1).reshape([ray_count]);

    // The disparity of an empty ray is zero.
    let is_empty = acc.to_owned().lower_elem(DISPARITY_EPSILON);
    let disp = depth
        .to_owned()
        .div(acc.to_owned().clamp_min(DISPARITY_EPSILON))
        .clamp_min(DISPARITY_EPSILON)
        .recip()
        .mask_fill(is_empty, 0.0);

    Composite {
        rgb,
        disp,
        acc,
        weights,
        depth,
    }
}
