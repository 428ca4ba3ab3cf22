pub use super::*;

/// Sampling depths in equal bins between the near and far bounds.
///
/// ## Details
///
/// The depth of bin `i` of `S` is at `t = (i + 0.5 + perturb * (u - 0.5)) / S`,
/// where `u ~ U[0, 1)`. So `perturb = 0` yields the bin midpoints
/// and `perturb = 1` yields a uniform jitter within each bin.
///
/// `t` interpolates the depth, or the inverse depth if [`Self::is_lindisp`].
#[derive(Clone, Debug, Module)]
pub struct StratifiedSampler {
    /// Number of samples per ray `S`.
    pub sample_count: usize,
    /// Sampling linearly in inverse depth.
    pub is_lindisp: bool,
}

impl StratifiedSampler {
    pub fn new(
        sample_count: usize,
        is_lindisp: bool,
    ) -> Self {
        Self {
            sample_count,
            is_lindisp,
        }
    }

    /// Sampling the rays.
    ///
    /// ## Arguments
    ///
    /// * `perturb` - The jitter ratio in `[0, 1]`.
    ///
    /// ## Shapes
    ///
    /// * `origins` - `[R, 3]`
    /// * `directions` - `[R, 3]`
    /// * `near` - `[R, 1]`
    /// * `far` - `[R, 1]`
    pub fn sample<B: Backend>(
        &self,
        origins: Tensor<B, 2>,
        directions: Tensor<B, 2>,
        near: Tensor<B, 2>,
        far: Tensor<B, 2>,
        perturb: f32,
    ) -> Samples<B> {
        let device = origins.device();
        let [ray_count, _] = origins.dims();
        let sample_count = self.sample_count;

        // [R, S]
        let mut offsets = Tensor::<B, 1, Int>::arange(0..sample_count as i64, &device)
            .float()
            .add_scalar(0.5)
            .reshape([1, sample_count])
            .expand([ray_count, sample_count]);
        if perturb > 0.0 {
            let jitters =
                Tensor::random([ray_count, sample_count], Distribution::Default, &device)
                    .sub_scalar(0.5)
                    .mul_scalar(perturb);
            offsets = offsets + jitters;
        }
        let steps = offsets.div_scalar(sample_count as f32);

        // [R, S]
        let depths = if self.is_lindisp {
            let near_inverse = near.recip();
            let far_inverse = far.recip();
            (near_inverse.to_owned() + (far_inverse - near_inverse) * steps).recip()
        } else {
            near.to_owned() + (far - near) * steps
        };

        Samples::new(origins, directions, depths)
    }
}
