pub mod output;

pub use super::{composite::*, ray::*, sampler::*};
pub use crate::scene::nerf::NerfNetwork;
pub use burn::config::Config;
pub use output::*;

use crate::{
    error::Error,
    function::{ChunkContext, TensorFloatExtension},
    preset::render::RAY_CHUNK_SIZE,
};

/// The mode of rendering.
///
/// [`RenderMode::Eval`] disables the depth jitter and the density noise.
#[derive(Config, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Train,
    Eval,
}

#[derive(Config, Debug)]
pub struct NerfRendererOptions {
    #[config(default = "RenderMode::Train")]
    pub mode: RenderMode,
    /// Maximum number of rays rendered at once.
    #[config(default = "RAY_CHUNK_SIZE")]
    pub chunk_size: usize,
    /// Returning the raw field outputs.
    #[config(default = true)]
    pub is_raw_returned: bool,
    /// Returning the sample points.
    #[config(default = false)]
    pub is_points_returned: bool,
}

/// The slices of a ray batch rendered at once.
struct RayChunk<B: Backend> {
    origins: Tensor<B, 2>,
    directions: Tensor<B, 2>,
    view_directions: Tensor<B, 2>,
    near: Tensor<B, 2>,
    far: Tensor<B, 2>,
    times: Option<Tensor<B, 2>>,
}

impl<B: Backend> NerfNetwork<B> {
    /// Rendering a batch of rays.
    ///
    /// ## Details
    ///
    /// The rays are rendered in chunks of [`NerfRendererOptions::chunk_size`],
    /// and the outputs keep the ray order.
    /// The style of the batch only conditions the fine stage.
    pub fn render(
        &self,
        rays: &RayBatch<B>,
        options: &NerfRendererOptions,
    ) -> Result<NerfRenderOutput<B>, Error> {
        rays.validate(self.stratified_sampler.is_lindisp)?;

        let ray_count = rays.ray_count();
        let context = ChunkContext::new(ray_count, options.chunk_size)?;
        let (perturb, raw_noise_std) = match options.mode {
            RenderMode::Train => (self.perturb, self.raw_noise_std),
            RenderMode::Eval => (0.0, 0.0),
        };

        #[cfg(debug_assertions)]
        log::debug!(
            target: "stylenerf_renderer::render",
            "NerfNetwork::render > ray_count ({ray_count}), chunk_count ({}), mode ({:?})",
            context.chunk_count(),
            options.mode,
        );

        if ray_count == 0 {
            return Ok(self.render_empty(options, &rays.origins.device()));
        }

        let (near, far) = rays.near_far();
        let view_directions = rays.view_directions();

        let outputs = context
            .ranges()
            .enumerate()
            .map(|(index, range)| {
                #[cfg(debug_assertions)]
                log::debug!(
                    target: "stylenerf_renderer::render",
                    "NerfNetwork::render > chunk ({}/{}), rays ({range:?})",
                    index + 1,
                    context.chunk_count(),
                );

                let chunk = RayChunk {
                    origins: context.slice(rays.origins.to_owned(), range.to_owned()),
                    directions: context.slice(rays.directions.to_owned(), range.to_owned()),
                    view_directions: context
                        .slice(view_directions.to_owned(), range.to_owned()),
                    near: context.slice(near.to_owned(), range.to_owned()),
                    far: context.slice(far.to_owned(), range.to_owned()),
                    times: rays
                        .times
                        .as_ref()
                        .map(|times| context.slice(times.to_owned(), range.to_owned())),
                };
                self.render_chunk(chunk, rays.style.as_ref(), perturb, raw_noise_std, options)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NerfRenderOutput::cat(outputs))
    }

    fn render_chunk(
        &self,
        chunk: RayChunk<B>,
        style: Option<&StyleVector<B>>,
        perturb: f32,
        raw_noise_std: f32,
        options: &NerfRendererOptions,
    ) -> Result<NerfRenderOutput<B>, Error> {
        let RayChunk {
            origins,
            directions,
            view_directions,
            near,
            far,
            times,
        } = chunk;
        let [ray_count, _] = origins.dims();

        // Coarse stage

        let samples = self.stratified_sampler.sample(
            origins.to_owned(),
            directions.to_owned(),
            near,
            far,
            perturb,
        );
        let raw = self.coarse.query(
            samples.points.to_owned(),
            Some(view_directions.to_owned()),
            times.to_owned(),
            None,
        )?;
        let coarse = NerfRenderOutput::new(
            composite(
                raw.to_owned(),
                samples.depths.to_owned(),
                directions.to_owned(),
                raw_noise_std,
                *self.rgb_activation,
            ),
            options.is_raw_returned.then_some(raw),
            options.is_points_returned.then_some(samples.points),
        );

        #[cfg(debug_assertions)]
        log::debug!(
            target: "stylenerf_renderer::render",
            "NerfNetwork::render_chunk > coarse ({ray_count} rays x {} samples)",
            self.stratified_sampler.sample_count,
        );

        // Fine stage

        let (Some(importance_sampler), Some(fine)) =
            (&self.importance_sampler, self.fine_field())
        else {
            return Ok(coarse);
        };

        let ImportanceSamples {
            merged,
            depths_drawn,
        } = importance_sampler.resample(
            origins,
            directions.to_owned(),
            samples.depths,
            coarse.weights.to_owned(),
            perturb,
        );
        let raw = fine.query(
            merged.points.to_owned(),
            Some(view_directions),
            times,
            style,
        )?;
        let output = NerfRenderOutput::new(
            composite(
                raw.to_owned(),
                merged.depths,
                directions,
                raw_noise_std,
                *self.rgb_activation,
            ),
            options.is_raw_returned.then_some(raw),
            options.is_points_returned.then_some(merged.points),
        );
        let z_std = depths_drawn.std_dim(1).reshape([ray_count]);

        #[cfg(debug_assertions)]
        log::debug!(
            target: "stylenerf_renderer::render",
            "NerfNetwork::render_chunk > fine ({ray_count} rays x {} samples), stylized ({})",
            output.weights.dims()[1],
            style.is_some(),
        );

        Ok(output.with_coarse(coarse, z_std))
    }

    fn render_empty(
        &self,
        options: &NerfRendererOptions,
        device: &B::Device,
    ) -> NerfRenderOutput<B> {
        let sample_count = self.stratified_sampler.sample_count;
        let coarse = NerfRenderOutput::empty(
            sample_count,
            options.is_raw_returned,
            options.is_points_returned,
            device,
        );

        match (&self.importance_sampler, self.fine_field()) {
            (Some(importance_sampler), Some(_)) => NerfRenderOutput::empty(
                sample_count + importance_sampler.sample_count,
                options.is_raw_returned,
                options.is_points_returned,
                device,
            )
            .with_coarse(coarse, Tensor::zeros([0], device)),
            _ => coarse,
        }
    }
}
