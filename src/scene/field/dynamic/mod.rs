//! Time-conditioned extension of the field network.

pub mod deformation;
pub mod scaling;
pub mod voxel;

pub use super::*;
pub use deformation::*;
pub use scaling::*;
pub use voxel::*;

use crate::{error::Error, scene::bbox::BoundingBox};

/// The configuration for [`DynamicField`].
#[derive(Config, Copy, Debug)]
pub struct DynamicFieldConfig {
    /// The box spanned by the voxel grid.
    pub bounding_box: BoundingBox,
    /// The initial number of voxels.
    #[config(default = 1_000_000)]
    pub voxel_count: usize,
    /// The number of voxels defining the base voxel size.
    #[config(default = 1_000_000)]
    pub voxel_count_base: usize,
    /// Number of feature channels `C` of the voxel grid.
    #[config(default = 6)]
    pub grid_channel_count: usize,
    /// Number of frequency bands of the time encoding.
    #[config(default = 8)]
    pub time_frequency_count: usize,
    /// Number of frequency bands of the grid feature encoding.
    #[config(default = 2)]
    pub grid_frequency_count: usize,
    /// Number of linear layers of the deformation network.
    #[config(default = 3)]
    pub deformation_depth: usize,
}

/// Time encoding, point deformation and voxel feature lookup.
#[derive(Debug, Module)]
pub struct DynamicField<B: Backend> {
    pub time_encoder: PositionalEncoder,
    pub time_net: TinyNet<B>,
    pub grid_encoder: PositionalEncoder,
    pub deformation: Deformation<B>,
    pub grid: VoxelGrid<B>,
}

impl DynamicFieldConfig {
    /// Initialize from the configuration.
    ///
    /// * `dim_position` is the dimension of the encoded points.
    /// * `width` is the hidden width of the time and deformation networks.
    pub fn init<B: Backend>(
        &self,
        dim_position: usize,
        width: usize,
        is_periodic: bool,
        device: &B::Device,
    ) -> Result<DynamicField<B>, Error> {
        let time_encoder = PositionalEncoderConfig::new(self.time_frequency_count)
            .with_is_periodic(is_periodic)
            .init();
        let grid_encoder = PositionalEncoderConfig::new(self.grid_frequency_count)
            .with_is_periodic(is_periodic)
            .init();
        let dim_time = self.dim_time();

        let time_net = TinyNetConfig::new(time_encoder.dim_output(1), dim_time)
            .with_dim_hidden(Some(width))
            .init(device);
        let deformation = DeformationConfig::new(dim_position, dim_time)
            .with_width(width)
            .with_depth(self.deformation_depth)
            .init(device)?;
        let grid = VoxelGridConfig::new(self.bounding_box)
            .with_channel_count(self.grid_channel_count)
            .with_voxel_count(self.voxel_count)
            .with_voxel_count_base(self.voxel_count_base)
            .init(device)?;

        Ok(DynamicField {
            time_encoder,
            time_net,
            grid_encoder,
            deformation,
            grid,
        })
    }

    /// Dimension of the time features, `C * (1 + 2 * L_grid)`.
    #[inline]
    pub fn dim_time(&self) -> usize {
        self.grid_channel_count * (1 + 2 * self.grid_frequency_count)
    }
}

impl<B: Backend> DynamicField<B> {
    /// Dimension of the features appended to the encoded points.
    #[inline]
    pub fn dim_output(&self) -> usize {
        self.time_net.fc2.weight.dims()[1]
            + self.grid_encoder.dim_output(3 * self.grid.channel_count())
    }

    /// Computing the time and voxel features of the points.
    ///
    /// ## Shapes
    ///
    /// * `points` - `[N, 3]`
    /// * `points_encoded` - `[N, P]`
    /// * `times` - `[N, 1]`
    /// * `output` - [`[N, F]`](Self::dim_output)
    pub fn forward(
        &self,
        points: Tensor<B, 2>,
        points_encoded: Tensor<B, 2>,
        times: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        // [N, T]
        let times_encoded = self.time_net.forward(self.time_encoder.forward(times));
        // [N, 3]
        let points_deformed =
            self.deformation
                .forward(points, points_encoded, times_encoded.to_owned());
        // [N, 3 * C * (1 + 2 * L_grid)]
        let grid_encoded = self
            .grid_encoder
            .forward(self.grid.sample_multiscale(points_deformed));

        Tensor::cat(vec![times_encoded, grid_encoded], 1)
    }
}
