pub use super::*;

use crate::{
    function::ChunkContext,
    preset::render::{CDF_GAP_EPSILON, CDF_SEARCH_SIZE_MAX, WEIGHT_EPSILON},
};

/// Resampling depths by the coarse weights.
///
/// ## Details
///
/// The weights of the interior coarse samples form a piecewise-constant PDF
/// over the bins between the midpoints of adjacent coarse depths.
/// New depths are drawn by inverting its CDF, then merged with the coarse depths.
#[derive(Clone, Debug, Module)]
pub struct ImportanceSampler {
    /// Number of new samples per ray `K`.
    pub sample_count: usize,
}

/// The output of [`ImportanceSampler::resample`].
#[derive(Clone, Debug)]
pub struct ImportanceSamples<B: Backend> {
    /// The merged samples, `[R, S + K]` depths.
    pub merged: Samples<B>,
    /// The new depths before merging.
    ///
    /// The shape is `[R, K]`.
    pub depths_drawn: Tensor<B, 2>,
}

impl ImportanceSampler {
    pub fn new(sample_count: usize) -> Self {
        Self { sample_count }
    }

    /// Resampling the rays.
    ///
    /// The coarse samples should have at least 3 depths per ray.
    /// The draws are uniform if `perturb > 0`, or evenly spaced in `[0, 1]` otherwise.
    /// The drawn depths are detached from the graph.
    ///
    /// ## Shapes
    ///
    /// * `origins` - `[R, 3]`
    /// * `directions` - `[R, 3]`
    /// * `depths` - `[R, S]`
    /// * `weights` - `[R, S]`
    pub fn resample<B: Backend>(
        &self,
        origins: Tensor<B, 2>,
        directions: Tensor<B, 2>,
        depths: Tensor<B, 2>,
        weights: Tensor<B, 2>,
        perturb: f32,
    ) -> ImportanceSamples<B> {
        let device = depths.device();
        let [ray_count, sample_count] = depths.dims();
        let draw_count = self.sample_count;
        debug_assert!(sample_count >= 3, "sample_count: {sample_count}");

        // [R, S - 1]
        let bins = (depths.to_owned().slice([0..ray_count, 1..sample_count])
            + depths.to_owned().slice([0..ray_count, 0..sample_count - 1]))
            .mul_scalar(0.5);
        // [R, S - 2]
        let weights = weights
            .slice([0..ray_count, 1..sample_count - 1])
            .detach()
            .add_scalar(WEIGHT_EPSILON);
        let pdf = weights.to_owned().div(weights.sum_dim(1));
        // [R, S - 1]
        let cdf = Tensor::cat(
            vec![
                Tensor::zeros([ray_count, 1], &device),
                pdf.sum_cumulative(1),
            ],
            1,
        );

        // [R, K]
        let draws = if perturb > 0.0 {
            Tensor::random([ray_count, draw_count], Distribution::Default, &device)
        } else {
            let scale = 1.0 / (draw_count.max(2) - 1) as f32;
            Tensor::<B, 1, Int>::arange(0..draw_count as i64, &device)
                .float()
                .mul_scalar(scale)
                .reshape([1, draw_count])
                .expand([ray_count, draw_count])
        };

        let chunk_size = (CDF_SEARCH_SIZE_MAX / (draw_count * sample_count).max(1)).max(1);
        let depths_drawn = Self::invert_cdf(bins, cdf, draws, chunk_size).detach();

        let depths_merged = Tensor::cat(vec![depths, depths_drawn.to_owned()], 1).sort(1);

        ImportanceSamples {
            merged: Samples::new(origins, directions, depths_merged),
            depths_drawn,
        }
    }

    /// Mapping uniform draws to depths through the CDF.
    ///
    /// The CDF is searched in chunks of `chunk_size` rays,
    /// so each chunk compares at most `chunk_size * K * B` pairs.
    ///
    /// ## Shapes
    ///
    /// * `bins` - `[R, B]`
    /// * `cdf` - `[R, B]`
    /// * `draws` - `[R, K]`
    /// * `output` - `[R, K]`
    fn invert_cdf<B: Backend>(
        bins: Tensor<B, 2>,
        cdf: Tensor<B, 2>,
        draws: Tensor<B, 2>,
        chunk_size: usize,
    ) -> Tensor<B, 2> {
        let [ray_count, bin_count] = cdf.dims();
        let [_, draw_count] = draws.dims();
        let index_max = bin_count as i32 - 1;
        if ray_count == 0 {
            return Tensor::zeros([0, draw_count], &draws.device());
        }

        let context = ChunkContext {
            batch_size: ray_count,
            chunk_size: chunk_size.max(1),
        };
        let indices = context
            .join(
                context
                    .ranges()
                    .map(|range| {
                        Self::count_not_greater(
                            context.slice(cdf.to_owned(), range.to_owned()),
                            context.slice(draws.to_owned(), range),
                        )
                    })
                    .collect(),
            )
            .int();
        let below = indices.to_owned().sub_scalar(1).clamp(0, index_max);
        let above = indices.clamp(0, index_max);

        let cdf_below = cdf.to_owned().gather(1, below.to_owned());
        let cdf_above = cdf.gather(1, above.to_owned());
        let bins_below = bins.to_owned().gather(1, below);
        let bins_above = bins.gather(1, above);

        let gaps = cdf_above - cdf_below.to_owned();
        let gaps = gaps.to_owned().mask_fill(gaps.lower_elem(CDF_GAP_EPSILON), 1.0);
        let ratios = (draws - cdf_below).div(gaps);

        bins_below.to_owned() + ratios * (bins_above - bins_below)
    }

    /// The count of CDF values not greater than each draw.
    ///
    /// ## Shapes
    ///
    /// * `cdf` - `[R, B]`
    /// * `draws` - `[R, K]`
    /// * `output` - `[R, K]`
    fn count_not_greater<B: Backend>(
        cdf: Tensor<B, 2>,
        draws: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let [ray_count, bin_count] = cdf.dims();
        let [_, draw_count] = draws.dims();
        let dims = [ray_count, draw_count, bin_count];

        cdf.reshape([ray_count, 1, bin_count])
            .expand(dims)
            .lower_equal(draws.reshape([ray_count, draw_count, 1]).expand(dims))
            .float()
            .sum_dim(2)
            .reshape([ray_count, draw_count])
    }
}
