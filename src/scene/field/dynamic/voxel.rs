//! Voxel feature grid.

pub use super::*;

use crate::{error::Error, scene::bbox::BoundingBox};
use burn::tensor::Int;

/// The configuration for [`VoxelGrid`].
#[derive(Config, Copy, Debug)]
pub struct VoxelGridConfig {
    /// The box spanned by the grid.
    pub bounding_box: BoundingBox,
    /// Number of feature channels `C`.
    #[config(default = 6)]
    pub channel_count: usize,
    /// The target number of voxels.
    #[config(default = 1_000_000)]
    pub voxel_count: usize,
    /// The number of voxels defining the base voxel size.
    #[config(default = 1_000_000)]
    pub voxel_count_base: usize,
}

/// A dense grid of learned feature vectors spanning a bounding box.
///
/// It is sampled trilinearly with the grid corners aligned to the box corners.
/// Samples outside the grid read zeros.
#[derive(Debug, Module)]
pub struct VoxelGrid<B: Backend> {
    /// The shape is `[C, X, Y, Z]`.
    pub features: Param<Tensor<B, 4>>,
    pub bounding_box: Ignored<BoundingBox>,
    pub voxel_count_base: usize,
}

impl VoxelGridConfig {
    /// Initialize from the configuration.
    ///
    /// The features are zeros.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<VoxelGrid<B>, Error> {
        self.bounding_box.validate()?;
        if self.channel_count == 0 {
            return Err(Error::Configuration(
                "the voxel grid should have at least 1 channel".into(),
            ));
        }
        if self.voxel_count == 0 || self.voxel_count_base == 0 {
            return Err(Error::Configuration(
                "the voxel counts should be positive".into(),
            ));
        }

        let [size_x, size_y, size_z] =
            VoxelGrid::<B>::world_size(&self.bounding_box, self.voxel_count);
        let channel_count = self.channel_count;

        let features = Param::uninitialized(
            Default::default(),
            move |device, is_require_grad| {
                Tensor::zeros([channel_count, size_x, size_y, size_z], device)
                    .set_require_grad(is_require_grad)
            },
            device.to_owned(),
            true,
        );

        let grid = VoxelGrid {
            features,
            bounding_box: Ignored(self.bounding_box),
            voxel_count_base: self.voxel_count_base,
        };

        let voxel_count = size_x * size_y * size_z;
        log::info!(
            target: "stylenerf_renderer::scene",
            "VoxelGrid::init > world_size ({:?}), voxel_size ({}), voxel_size_ratio ({})",
            [size_x, size_y, size_z],
            VoxelGrid::<B>::voxel_size_of(&self.bounding_box, voxel_count),
            VoxelGrid::<B>::voxel_size_of(&self.bounding_box, voxel_count)
                / VoxelGrid::<B>::voxel_size_of(&self.bounding_box, self.voxel_count_base),
        );

        Ok(grid)
    }
}

impl<B: Backend> VoxelGrid<B> {
    /// The grid resolution for `voxel_count` voxels in `bounding_box`.
    ///
    /// Every axis has at least 2 grid points.
    pub fn world_size(
        bounding_box: &BoundingBox,
        voxel_count: usize,
    ) -> [usize; 3] {
        let voxel_size =
            (bounding_box.volume() as f64 / voxel_count.max(1) as f64).cbrt();
        bounding_box
            .extents()
            .map(|extent| ((extent as f64 / voxel_size + 1e-6).floor() as usize).max(2))
    }

    /// The edge length of a voxel for `voxel_count` voxels in `bounding_box`.
    #[inline]
    pub fn voxel_size_of(
        bounding_box: &BoundingBox,
        voxel_count: usize,
    ) -> f32 {
        (bounding_box.volume() / voxel_count.max(1) as f32).cbrt()
    }

    /// Number of feature channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.features.dims()[0]
    }

    /// Current resolution `[X, Y, Z]`.
    #[inline]
    pub fn size(&self) -> [usize; 3] {
        let [_, size_x, size_y, size_z] = self.features.dims();
        [size_x, size_y, size_z]
    }

    /// Current number of voxels.
    #[inline]
    pub fn voxel_count(&self) -> usize {
        self.size().iter().product()
    }

    /// Current edge length of a voxel.
    #[inline]
    pub fn voxel_size(&self) -> f32 {
        Self::voxel_size_of(&self.bounding_box, self.voxel_count())
    }

    /// The ratio of the current voxel size to the base voxel size.
    #[inline]
    pub fn voxel_size_ratio(&self) -> f32 {
        self.voxel_size() / Self::voxel_size_of(&self.bounding_box, self.voxel_count_base)
    }

    /// Sampling the features at world positions.
    ///
    /// ## Shapes
    ///
    /// * `positions` - `[N, 3]`
    /// * `output` - `[N, C]`
    pub fn sample(
        &self,
        positions: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        Self::sample_grid(self.features.val(), &self.bounding_box, positions)
    }

    /// Sampling the features at three resolutions.
    ///
    /// The grid is padded with zeros so that every `size - 1` is a multiple of 4,
    /// then it is strided by 1, 2 and 4.
    ///
    /// ## Shapes
    ///
    /// * `positions` - `[N, 3]`
    /// * `output` - `[N, 3 * C]`
    pub fn sample_multiscale(
        &self,
        positions: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let mut grid = self.features.val();
        let device = grid.device();

        for axis in 1..4 {
            let dims = grid.dims();
            let size = dims[axis];
            let padding = (size - 1).div_ceil(4) * 4 + 1 - size;
            if padding > 0 {
                let mut dims_padding = dims;
                dims_padding[axis] = padding;
                grid = Tensor::cat(vec![grid, Tensor::zeros(dims_padding, &device)], axis);
            }
        }

        let grid_half = Self::stride(grid.to_owned(), 2);
        let grid_quarter = Self::stride(grid.to_owned(), 4);

        Tensor::cat(
            vec![
                Self::sample_grid(grid, &self.bounding_box, positions.to_owned()),
                Self::sample_grid(grid_half, &self.bounding_box, positions.to_owned()),
                Self::sample_grid(grid_quarter, &self.bounding_box, positions),
            ],
            1,
        )
    }

    /// Resampling the features to the resolution of `voxel_count` voxels.
    ///
    /// The features are interpolated trilinearly with aligned corners,
    /// so the spatial meaning is preserved.
    pub fn scale(
        &mut self,
        voxel_count: usize,
    ) -> &mut Self {
        let size_source = self.size();
        let size_target = Self::world_size(&self.bounding_box, voxel_count);
        let features = self.features.val().detach();
        let device = features.device();
        let channel_count = self.channel_count();

        let [target_x, target_y, target_z] = size_target;
        let point_count = target_x * target_y * target_z;
        let steps = [0, 1, 2].map(|axis| {
            if size_target[axis] > 1 {
                (size_source[axis] - 1) as f32 / (size_target[axis] - 1) as f32
            } else {
                0.0
            }
        });
        let mut indices = Vec::with_capacity(point_count * 3);
        for x in 0..target_x {
            for y in 0..target_y {
                for z in 0..target_z {
                    indices.push(x as f32 * steps[0]);
                    indices.push(y as f32 * steps[1]);
                    indices.push(z as f32 * steps[2]);
                }
            }
        }
        let indices = Tensor::from_data(TensorData::new(indices, [point_count, 3]), &device);

        // [C, X', Y', Z']
        let features = Self::interpolate(features, indices)
            .reshape([target_x, target_y, target_z, channel_count])
            .permute([3, 0, 1, 2]);

        log::info!(
            target: "stylenerf_renderer::scene",
            "VoxelGrid::scale > world_size ({size_source:?} -> {size_target:?}), voxel_size_ratio ({})",
            Self::voxel_size_of(&self.bounding_box, point_count)
                / Self::voxel_size_of(&self.bounding_box, self.voxel_count_base),
        );

        self.features =
            Param::initialized(self.features.id.to_owned(), features.require_grad());
        self
    }

    fn stride(
        grid: Tensor<B, 4>,
        step: usize,
    ) -> Tensor<B, 4> {
        let device = grid.device();
        (1..4).fold(grid, |grid, axis| {
            let size = grid.dims()[axis];
            let indices = Tensor::<B, 1, Int>::arange_step(0..size as i64, step, &device);
            grid.select(axis, indices)
        })
    }

    /// Sampling `grid` with world positions mapped from `bounding_box`.
    fn sample_grid(
        grid: Tensor<B, 4>,
        bounding_box: &BoundingBox,
        positions: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let device = grid.device();
        let [_, size_x, size_y, size_z] = grid.dims();
        let [point_count, _] = positions.dims();
        let extents = bounding_box.extents();
        let sizes = [size_x, size_y, size_z];

        let offsets = Tensor::<B, 1>::from_floats(bounding_box.min, &device).reshape([1, 3]);
        let scales = Tensor::<B, 1>::from_floats(
            [0, 1, 2].map(|axis| (sizes[axis] - 1) as f32 / extents[axis]),
            &device,
        )
        .reshape([1, 3]);

        // [N, 3]
        let indices = (positions - offsets) * scales;
        debug_assert_eq!(indices.dims(), [point_count, 3]);

        Self::interpolate(grid, indices)
    }

    /// Trilinear interpolation at continuous grid indices.
    ///
    /// ## Shapes
    ///
    /// * `grid` - `[C, X, Y, Z]`
    /// * `indices` - `[N, 3]`
    /// * `output` - `[N, C]`
    fn interpolate(
        grid: Tensor<B, 4>,
        indices: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let device = grid.device();
        let [channel_count, size_x, size_y, size_z] = grid.dims();
        let [point_count, _] = indices.dims();
        let sizes = [size_x, size_y, size_z];

        // [X * Y * Z, C]
        let table = grid
            .reshape([channel_count, size_x * size_y * size_z])
            .swap_dims(0, 1);

        let bases = indices.to_owned().floor();
        let fractions = indices - bases.to_owned();
        let bases = bases.int();

        let mut output = Tensor::zeros([point_count, channel_count], &device);
        for corner in 0..8 {
            let mut weight = Tensor::<B, 2>::ones([point_count, 1], &device);
            let mut index_flat = Tensor::<B, 2, Int>::zeros([point_count, 1], &device);

            for (axis, size) in sizes.iter().copied().enumerate() {
                let offset = (corner >> (2 - axis)) & 1;
                let index = bases
                    .to_owned()
                    .slice([0..point_count, axis..axis + 1])
                    .add_scalar(offset as i32);
                let fraction = fractions.to_owned().slice([0..point_count, axis..axis + 1]);
                let is_inside = index
                    .to_owned()
                    .greater_equal_elem(0)
                    .int()
                    .mul(index.to_owned().lower_elem(size as i32).int())
                    .float();

                weight = weight
                    * if offset == 1 {
                        fraction
                    } else {
                        fraction.neg().add_scalar(1.0)
                    }
                    * is_inside;
                index_flat = index_flat.mul_scalar(size as i32)
                    + index.clamp(0, size as i32 - 1);
            }

            let values = table
                .to_owned()
                .select(0, index_flat.reshape([point_count]));
            output = output + values * weight;
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn unit_box() -> BoundingBox {
        BoundingBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])
    }

    #[test]
    fn world_size() {
        let bounding_box = BoundingBox::new([0.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
        assert_eq!(VoxelGrid::<B>::world_size(&bounding_box, 2 * 10 * 10 * 10 + 1), [20, 10, 10]);
        assert_eq!(VoxelGrid::<B>::world_size(&bounding_box, 1), [2, 2, 2]);
    }

    #[test]
    fn init_invalid() {
        let device = &Default::default();

        let config = VoxelGridConfig::new(BoundingBox::new([0.0; 3], [1.0, 1.0, 0.0]));
        assert!(matches!(config.init::<B>(device), Err(Error::Configuration(_))));

        let config = VoxelGridConfig::new(unit_box()).with_voxel_count(0);
        assert!(matches!(config.init::<B>(device), Err(Error::Configuration(_))));
    }

    #[test]
    fn sample_linear_field() {
        let device = &Default::default();

        let mut grid = VoxelGridConfig::new(unit_box())
            .with_channel_count(1)
            .with_voxel_count(27)
            .init::<B>(device)
            .unwrap();
        assert_eq!(grid.size(), [3, 3, 3]);

        // f(x, y, z) = x + 2 y + 4 z at grid points spaced by 0.5
        let mut values = Vec::new();
        for x in 0..3 {
            for y in 0..3 {
                for z in 0..3 {
                    values.push(0.5 * (x + 2 * y + 4 * z) as f32);
                }
            }
        }
        grid.features = Param::from_tensor(Tensor::from_data(
            TensorData::new(values, [1, 3, 3, 3]),
            device,
        ));

        let positions = Tensor::<B, 2>::from_data(
            [[0.25, 0.5, 0.75], [1.0, 1.0, 1.0], [0.1, 0.9, 0.3]],
            device,
        );
        let output = grid.sample(positions).into_data().to_vec::<f32>().unwrap();
        let target = [
            0.25 + 2.0 * 0.5 + 4.0 * 0.75,
            7.0,
            0.1 + 2.0 * 0.9 + 4.0 * 0.3,
        ];
        for (output, target) in output.iter().zip(target) {
            assert!((output - target).abs() < 1e-5, "{output} != {target}");
        }
    }

    #[test]
    fn sample_outside_reads_zeros() {
        let device = &Default::default();

        let mut grid = VoxelGridConfig::new(unit_box())
            .with_channel_count(2)
            .with_voxel_count(8)
            .init::<B>(device)
            .unwrap();
        grid.features = Param::from_tensor(Tensor::ones([2, 2, 2, 2], device));

        let positions = Tensor::<B, 2>::from_data([[5.0, 5.0, 5.0], [0.5, 0.5, 0.5]], device);
        let output = grid.sample(positions).into_data().to_vec::<f32>().unwrap();
        assert_eq!(output[0..2], [0.0, 0.0]);
        assert!((output[2] - 1.0).abs() < 1e-6);
        assert!((output[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sample_multiscale_shape() {
        let device = &Default::default();

        let grid = VoxelGridConfig::new(unit_box())
            .with_channel_count(4)
            .with_voxel_count(7 * 7 * 7)
            .init::<B>(device)
            .unwrap();
        let positions = Tensor::<B, 2>::ones([5, 3], device).mul_scalar(0.5);
        let output = grid.sample_multiscale(positions);
        assert_eq!(output.dims(), [5, 12]);
    }

    #[test]
    fn scale_preserves_linear_field() {
        let device = &Default::default();

        let mut grid = VoxelGridConfig::new(unit_box())
            .with_channel_count(1)
            .with_voxel_count(8)
            .init::<B>(device)
            .unwrap();
        grid.features = Param::from_tensor(Tensor::from_data(
            TensorData::new(vec![0.0, 4.0, 2.0, 6.0, 1.0, 5.0, 3.0, 7.0], [1, 2, 2, 2]),
            device,
        ));

        grid.scale(27);
        assert_eq!(grid.size(), [3, 3, 3]);
        assert_eq!(grid.voxel_count(), 27);

        let positions = Tensor::<B, 2>::from_data([[0.5, 0.5, 0.5], [1.0, 0.0, 1.0]], device);
        let output = grid.sample(positions).into_data().to_vec::<f32>().unwrap();
        assert!((output[0] - 3.5).abs() < 1e-5);
        assert!((output[1] - 5.0).abs() < 1e-5);
    }
}
