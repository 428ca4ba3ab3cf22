//! Radiance field networks.

pub mod activation;
pub mod dynamic;
pub mod encoder;
pub mod mlp;
pub mod style;
pub mod tinynet;

pub use super::*;
pub use activation::*;
pub use dynamic::*;
pub use encoder::*;
pub use mlp::*;
pub use style::*;
pub use tinynet::*;

use crate::{
    error::Error,
    function::ChunkContext,
    preset::render::POINT_CHUNK_SIZE,
};

/// The configuration for [`FieldNetwork`].
#[derive(Config, Debug)]
pub struct FieldNetworkConfig {
    /// Number of backbone layers.
    #[config(default = 8)]
    pub depth: usize,
    /// Hidden width `W`.
    #[config(default = 256)]
    pub width: usize,
    /// The layer indices after which the backbone input is concatenated again.
    #[config(default = "vec![4]")]
    pub skips: Vec<usize>,
    /// The name of the activation function.
    #[config(default = "String::from(\"relu\")")]
    pub activation: String,
    /// Conditioning the color on the view directions.
    #[config(default = true)]
    pub is_viewdirs_used: bool,
    /// Replacing the encoded view directions with zeros.
    #[config(default = false)]
    pub is_viewdir_zeroed: bool,
    /// Number of frequency bands of the point encoding.
    #[config(default = 10)]
    pub position_frequency_count: usize,
    /// Number of frequency bands of the view direction encoding.
    #[config(default = 4)]
    pub direction_frequency_count: usize,
    /// Applying the periodic functions in every encoder.
    #[config(default = true)]
    pub is_encoding_periodic: bool,
    /// Maximum number of points evaluated at once.
    #[config(default = "POINT_CHUNK_SIZE")]
    pub point_chunk_size: usize,
    /// Style conditioning.
    pub style: Option<StyleConfig>,
    /// Time conditioning.
    pub dynamic: Option<DynamicFieldConfig>,
}

/// The network mapping points to raw colors and densities.
///
/// ## Details
///
/// The backbone input is the encoded point, followed by the time and voxel features
/// if the field is dynamic.
/// The points are evaluated in chunks of [`Self::point_chunk_size`],
/// and the outputs keep the input order.
#[derive(Module)]
pub struct FieldNetwork<B: Backend> {
    pub position_encoder: PositionalEncoder,
    pub direction_encoder: Option<PositionalEncoder>,
    pub dynamic: Option<DynamicField<B>>,
    pub style_embedder: Option<StyleEmbedder<B>>,
    pub mlp: FieldMlp<B>,
    pub point_chunk_size: usize,
}

impl FieldNetworkConfig {
    /// Initialize from the configuration.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<FieldNetwork<B>, Error> {
        if self.point_chunk_size == 0 {
            return Err(Error::Configuration(
                "the point chunk size should be positive".into(),
            ));
        }

        let position_encoder = PositionalEncoderConfig::new(self.position_frequency_count)
            .with_is_periodic(self.is_encoding_periodic)
            .init();
        let dim_position = position_encoder.dim_output(3);

        let direction_encoder = self.is_viewdirs_used.then(|| {
            PositionalEncoderConfig::new(self.direction_frequency_count)
                .with_is_periodic(self.is_encoding_periodic)
                .init()
        });
        let dim_view = direction_encoder
            .as_ref()
            .map(|encoder| encoder.dim_output(3));

        let dynamic = self
            .dynamic
            .map(|config| {
                config.init(dim_position, self.width, self.is_encoding_periodic, device)
            })
            .transpose()?;
        let dim_input = dim_position
            + dynamic
                .as_ref()
                .map(|dynamic| dynamic.dim_output())
                .unwrap_or_default();

        let mlp = FieldMlpConfig::new(dim_input)
            .with_dim_view(dim_view)
            .with_depth(self.depth)
            .with_width(self.width)
            .with_skips(self.skips.to_owned())
            .with_activation(self.activation.to_owned())
            .with_is_viewdir_zeroed(self.is_viewdir_zeroed)
            .with_style(self.style)
            .init(device)?;
        let style_embedder = self
            .style
            .map(|style| style.init_embedder(self.width, dim_position, device))
            .transpose()?;

        Ok(FieldNetwork {
            position_encoder,
            direction_encoder,
            dynamic,
            style_embedder,
            mlp,
            point_chunk_size: self.point_chunk_size,
        })
    }
}

impl<B: Backend> FieldNetwork<B> {
    /// Querying the raw outputs at the sample points of rays.
    ///
    /// ## Arguments
    ///
    /// * `view_directions` - Normalized ray directions. A view-conditioned field
    ///   uses a zero direction if they are absent.
    /// * `times` - Required by a dynamic field and ignored by a static one.
    /// * `style` - Mixed into the heads if the field is style-conditioned.
    ///
    /// ## Shapes
    ///
    /// * `points` - `[R, S, 3]`
    /// * `view_directions` - `[R, 3]`
    /// * `times` - `[R, 1]`
    /// * `output` - `[R, S, 4]`
    pub fn query(
        &self,
        points: Tensor<B, 3>,
        view_directions: Option<Tensor<B, 2>>,
        times: Option<Tensor<B, 2>>,
        style: Option<&StyleVector<B>>,
    ) -> Result<Tensor<B, 3>, Error> {
        let [ray_count, sample_count, _] = points.dims();
        let point_count = ray_count * sample_count;

        if let Some(view_directions) = &view_directions {
            Self::check_dims(view_directions.dims(), [ray_count, 3], "view directions")?;
        }
        if let Some(times) = &times {
            Self::check_dims(times.dims(), [ray_count, 1], "times")?;
        }

        // [R * S, 3]
        let view_directions = view_directions.map(|view_directions| {
            view_directions
                .reshape([ray_count, 1, 3])
                .expand([ray_count, sample_count, 3])
                .reshape([point_count, 3])
        });
        // [R * S, 1]
        let times = times.map(|times| {
            times
                .reshape([ray_count, 1, 1])
                .expand([ray_count, sample_count, 1])
                .reshape([point_count, 1])
        });

        Ok(self
            .query_flat(points.reshape([point_count, 3]), view_directions, times, style)?
            .reshape([ray_count, sample_count, 4]))
    }

    /// Querying the raw outputs at arbitrary points.
    ///
    /// ## Shapes
    ///
    /// * `points` - `[N, 3]`
    /// * `view_directions` - `[N, 3]`
    /// * `times` - `[N, 1]`
    /// * `output` - `[N, 4]`
    pub fn query_flat(
        &self,
        points: Tensor<B, 2>,
        view_directions: Option<Tensor<B, 2>>,
        times: Option<Tensor<B, 2>>,
        style: Option<&StyleVector<B>>,
    ) -> Result<Tensor<B, 2>, Error> {
        let [point_count, _] = points.dims();
        let device = points.device();

        Self::check_dims(points.dims(), [point_count, 3], "points")?;
        if let (Some(embedder), Some(style)) = (&self.style_embedder, style) {
            let style_count = embedder.layers[0].weight.dims()[0];
            if style.style_count() != style_count {
                return Err(Error::Validation(
                    format!("the style count {}", style.style_count()),
                    format!("{style_count}"),
                ));
            }
        }
        if self.dynamic.is_some() && times.is_none() {
            return Err(Error::Validation(
                "the times".into(),
                "given to a dynamic field".into(),
            ));
        }

        #[cfg(debug_assertions)]
        log::debug!(
            target: "stylenerf_renderer::scene",
            "FieldNetwork::query > point_count ({point_count})",
        );

        // The inputs are packed as [points, view directions, times] to be chunked at once.
        let view_directions =
            view_directions.unwrap_or_else(|| Tensor::zeros([point_count, 3], &device));
        let times = times.unwrap_or_else(|| Tensor::zeros([point_count, 1], &device));
        let inputs = Tensor::cat(vec![points, view_directions, times], 1);

        ChunkContext::new(point_count, self.point_chunk_size)?.map(inputs, |inputs, range| {
            let count = range.len();
            let points = inputs.to_owned().slice([0..count, 0..3]);
            let view_directions = inputs.to_owned().slice([0..count, 3..6]);
            let times = inputs.slice([0..count, 6..7]);
            self.forward(points, view_directions, times, style)
        })
    }

    /// The forward pass on a chunk of points.
    fn forward(
        &self,
        points: Tensor<B, 2>,
        view_directions: Tensor<B, 2>,
        times: Tensor<B, 2>,
        style: Option<&StyleVector<B>>,
    ) -> Result<Tensor<B, 2>, Error> {
        // [N, P]
        let points_encoded = self.position_encoder.forward(points.to_owned());

        let style_features = self
            .style_embedder
            .as_ref()
            .zip(style)
            .map(|(embedder, style)| embedder.forward(style, points_encoded.to_owned()));

        let input = match &self.dynamic {
            Some(dynamic) => Tensor::cat(
                vec![
                    points_encoded.to_owned(),
                    dynamic.forward(points, points_encoded, times),
                ],
                1,
            ),
            None => points_encoded,
        };

        let views = self
            .direction_encoder
            .as_ref()
            .map(|encoder| encoder.forward(view_directions));

        self.mlp.forward(input, views, style_features)
    }

    /// Resampling the voxel grid of a dynamic field to `voxel_count` voxels.
    pub fn scale_voxel_grid(
        &mut self,
        voxel_count: usize,
    ) -> &mut Self {
        if let Some(dynamic) = &mut self.dynamic {
            dynamic.grid.scale(voxel_count);
        }
        self
    }

    /// Disabling the gradients of the backbone and the heads.
    pub fn freeze_backbone(self) -> Self {
        Self {
            mlp: self.mlp.no_grad(),
            ..self
        }
    }

    /// The color gate of style mixing.
    #[inline]
    pub fn gamma(&self) -> Option<Tensor<B, 1>> {
        self.mlp.gamma()
    }

    /// The density gate of style mixing.
    #[inline]
    pub fn lemma(&self) -> Option<Tensor<B, 1>> {
        self.mlp.lemma()
    }

    /// Checking whether the field is time-conditioned.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic.is_some()
    }

    /// Checking whether the field is style-conditioned.
    #[inline]
    pub fn is_stylized(&self) -> bool {
        self.style_embedder.is_some()
    }

    fn check_dims<const D: usize>(
        dims: [usize; D],
        dims_target: [usize; D],
        name: &str,
    ) -> Result<(), Error> {
        if dims != dims_target {
            return Err(Error::Validation(
                format!("the shape of {name} {dims:?}"),
                format!("{dims_target:?}"),
            ));
        }
        Ok(())
    }
}

impl<B: Backend> std::fmt::Debug for FieldNetwork<B> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        f.debug_struct(&format!("FieldNetwork<{}>", B::name()))
            .field("layer_count", &self.mlp.layers.len())
            .field("is_viewdirs_used", &self.direction_encoder.is_some())
            .field("is_dynamic", &self.is_dynamic())
            .field("is_stylized", &self.is_stylized())
            .field("num_params", &self.num_params())
            .finish()
    }
}
