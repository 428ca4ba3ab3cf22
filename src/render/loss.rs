//! Image and density losses.

pub use super::NerfRenderOutput;
pub use burn::tensor::{backend::Backend, Tensor};

use crate::error::Error;
use std::f32::consts::LN_10;

/// Mean squared error.
pub fn mse<B: Backend, const D: usize>(
    input: Tensor<B, D>,
    target: Tensor<B, D>,
) -> Tensor<B, 1> {
    (input - target).powf_scalar(2.0).mean()
}

/// Mean absolute error.
pub fn mae<B: Backend, const D: usize>(
    input: Tensor<B, D>,
    target: Tensor<B, D>,
) -> Tensor<B, 1> {
    (input - target).abs().mean()
}

/// Peak signal-to-noise ratio of colors in `[0, 1]`.
///
/// `psnr = -10 * log10(mse)`
pub fn psnr<B: Backend>(mse: Tensor<B, 1>) -> Tensor<B, 1> {
    mse.log().mul_scalar(-10.0 / LN_10)
}

/// The MAE between the raw densities of two renders.
///
/// It covers the coarse stage as well if both renders have one.
/// Both renders should keep their raw outputs.
pub fn density_distillation_loss<B: Backend>(
    student: &NerfRenderOutput<B>,
    target: &NerfRenderOutput<B>,
) -> Result<Tensor<B, 1>, Error> {
    let mut loss = density_mae(student, target)?;

    if let (Some(student), Some(target)) = (&student.coarse, &target.coarse) {
        loss = loss + density_mae(student, target)?;
    }

    Ok(loss)
}

fn density_mae<B: Backend>(
    student: &NerfRenderOutput<B>,
    target: &NerfRenderOutput<B>,
) -> Result<Tensor<B, 1>, Error> {
    let (Some(student), Some(target)) = (&student.raw, &target.raw) else {
        return Err(Error::Validation(
            "the raw outputs".into(),
            "returned by both renders".into(),
        ));
    };
    if student.dims() != target.dims() {
        return Err(Error::Validation(
            format!("the shape of raw outputs {:?}", student.dims()),
            format!("{:?}", target.dims()),
        ));
    }

    let [ray_count, sample_count, _] = student.dims();
    let density = |raw: &Tensor<B, 3>| {
        raw.to_owned()
            .slice([0..ray_count, 0..sample_count, 3..4])
    };

    Ok(mae(density(student), density(target).detach()))
}
