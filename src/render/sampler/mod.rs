//! Depth sampling along rays.

pub mod importance;
pub mod stratified;

pub use crate::function::TensorFloatExtension;
pub use burn::{
    module::Module,
    tensor::{backend::Backend, Distribution, Int, Tensor},
};
pub use importance::*;
pub use stratified::*;

/// Depths along rays and their points.
#[derive(Clone, Debug)]
pub struct Samples<B: Backend> {
    /// `[R, S, 3]`
    pub points: Tensor<B, 3>,
    /// `[R, S]`
    ///
    /// They increase along every ray.
    pub depths: Tensor<B, 2>,
}

impl<B: Backend> Samples<B> {
    /// Computing the points `origin + depth * direction`.
    ///
    /// ## Shapes
    ///
    /// * `origins` - `[R, 3]`
    /// * `directions` - `[R, 3]`
    /// * `depths` - `[R, S]`
    pub fn new(
        origins: Tensor<B, 2>,
        directions: Tensor<B, 2>,
        depths: Tensor<B, 2>,
    ) -> Self {
        let [ray_count, sample_count] = depths.dims();
        let points = origins.reshape([ray_count, 1, 3])
            + directions.reshape([ray_count, 1, 3])
                * depths.to_owned().reshape([ray_count, sample_count, 1]);

        Self { points, depths }
    }

    /// Number of samples per ray `S`.
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.depths.dims()[1]
    }
}
