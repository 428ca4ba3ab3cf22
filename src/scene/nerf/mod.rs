//! Coarse-to-fine radiance field network.

pub mod checkpoint;
pub mod property;

pub use super::{field::*, *};
pub use crate::render::{
    composite::ColorActivation,
    sampler::{ImportanceSampler, StratifiedSampler},
};
pub use checkpoint::*;

use crate::error::Error;

/// The configuration for [`NerfNetwork`].
#[derive(Config, Debug)]
pub struct NerfNetworkConfig {
    /// The field queried at the stratified samples.
    pub coarse: FieldNetworkConfig,
    /// The field queried at the merged importance samples.
    ///
    /// It is not built if the importance stage is skipped.
    pub fine: Option<FieldNetworkConfig>,
    /// Querying the coarse field at the importance samples as well.
    ///
    /// [`Self::fine`] is ignored if it is `true`.
    #[config(default = false)]
    pub is_fine_shared: bool,
    /// Number of stratified samples per ray.
    #[config(default = 64)]
    pub sample_count: usize,
    /// Number of importance samples per ray.
    ///
    /// The importance stage is skipped if it is `0`.
    #[config(default = 64)]
    pub importance_sample_count: usize,
    /// The jitter ratio in training, in `[0, 1]`.
    #[config(default = 1.0)]
    pub perturb: f32,
    /// The standard deviation of density noise in training.
    #[config(default = 0.0)]
    pub raw_noise_std: f32,
    /// Sampling linearly in inverse depth.
    #[config(default = false)]
    pub is_lindisp: bool,
    /// The activation of the raw colors.
    #[config(default = "ColorActivation::Sigmoid")]
    pub rgb_activation: ColorActivation,
}

/// The two-stage network rendering rays.
///
/// ## Details
///
/// The coarse stage samples depths in bins and composites the coarse field.
/// The fine stage, if present, resamples depths by the coarse weights
/// and composites the fine field at the merged depths.
#[derive(Module)]
pub struct NerfNetwork<B: Backend> {
    pub coarse: FieldNetwork<B>,
    pub fine: Option<FieldNetwork<B>>,
    pub is_fine_shared: bool,
    pub stratified_sampler: StratifiedSampler,
    pub importance_sampler: Option<ImportanceSampler>,
    pub perturb: f32,
    pub raw_noise_std: f32,
    pub rgb_activation: Ignored<ColorActivation>,
}

impl NerfNetworkConfig {
    /// Initialize from the configuration.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<NerfNetwork<B>, Error> {
        let is_importance_used = self.importance_sample_count > 0;

        if self.sample_count == 0 {
            return Err(Error::Configuration(
                "the sample count should be positive".into(),
            ));
        }
        if is_importance_used && self.sample_count < 3 {
            return Err(Error::Configuration(format!(
                "the sample count {} should be at least 3 for importance sampling",
                self.sample_count
            )));
        }
        if is_importance_used && self.fine.is_none() && !self.is_fine_shared {
            return Err(Error::Configuration(
                "importance sampling requires a fine network".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.perturb) {
            return Err(Error::Configuration(format!(
                "the perturbation {} should be in [0, 1]",
                self.perturb
            )));
        }
        if !(self.raw_noise_std >= 0.0) {
            return Err(Error::Configuration(format!(
                "the raw noise deviation {} should be non-negative",
                self.raw_noise_std
            )));
        }

        let coarse = self.coarse.init(device)?;
        let fine = match (&self.fine, self.is_fine_shared) {
            (Some(fine), false) if is_importance_used => Some(fine.init(device)?),
            _ => None,
        };
        let stratified_sampler = StratifiedSampler::new(self.sample_count, self.is_lindisp);
        let importance_sampler =
            is_importance_used.then(|| ImportanceSampler::new(self.importance_sample_count));

        Ok(NerfNetwork {
            coarse,
            fine,
            is_fine_shared: self.is_fine_shared,
            stratified_sampler,
            importance_sampler,
            perturb: self.perturb,
            raw_noise_std: self.raw_noise_std,
            rgb_activation: Ignored(self.rgb_activation),
        })
    }
}

impl<B: Backend> NerfNetwork<B> {
    /// The field of the fine stage.
    ///
    /// It is `None` if the fine stage is skipped.
    pub fn fine_field(&self) -> Option<&FieldNetwork<B>> {
        self.importance_sampler.as_ref()?;
        if self.is_fine_shared {
            Some(&self.coarse)
        } else {
            self.fine.as_ref()
        }
    }

    /// Querying the raw outputs of the coarse field at arbitrary points.
    ///
    /// The view directions are zero.
    ///
    /// ## Shapes
    ///
    /// * `points` - `[N, 3]`
    /// * `times` - `[N, 1]`
    /// * `output` - `[N, 4]`
    pub fn query_points(
        &self,
        points: Tensor<B, 2>,
        times: Option<Tensor<B, 2>>,
    ) -> Result<Tensor<B, 2>, Error> {
        let [point_count, dim] = points.dims();
        if dim != 3 {
            return Err(Error::Validation(
                format!("the shape of points {:?}", points.dims()),
                format!("{:?}", [point_count, 3]),
            ));
        }
        if point_count == 0 {
            return Ok(Tensor::zeros([0, 4], &points.device()));
        }
        if let Some(times) = &times {
            if times.dims() != [point_count, 1] {
                return Err(Error::Validation(
                    format!("the shape of times {:?}", times.dims()),
                    format!("{:?}", [point_count, 1]),
                ));
            }
        }

        self.coarse.query_flat(points, None, times, None)
    }

    /// Resampling the voxel grids of every dynamic field to `voxel_count` voxels.
    pub fn scale_voxel_grids(
        &mut self,
        voxel_count: usize,
    ) -> &mut Self {
        self.coarse.scale_voxel_grid(voxel_count);
        if let Some(fine) = &mut self.fine {
            fine.scale_voxel_grid(voxel_count);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::Distribution};

    type B = NdArray<f32>;

    pub fn field_config_small() -> FieldNetworkConfig {
        FieldNetworkConfig::new()
            .with_depth(3)
            .with_width(16)
            .with_skips(vec![1])
            .with_position_frequency_count(4)
            .with_direction_frequency_count(2)
    }

    #[test]
    fn init_invalid() {
        let device = &Default::default();

        let error = NerfNetworkConfig::new(field_config_small())
            .init::<B>(device)
            .unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));

        let error = NerfNetworkConfig::new(field_config_small())
            .with_fine(Some(field_config_small()))
            .with_sample_count(2)
            .init::<B>(device)
            .unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));

        let error = NerfNetworkConfig::new(field_config_small())
            .with_importance_sample_count(0)
            .with_perturb(2.0)
            .init::<B>(device)
            .unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));
    }

    #[test]
    fn init_stages() {
        let device = &Default::default();

        let network = NerfNetworkConfig::new(field_config_small())
            .with_importance_sample_count(0)
            .init::<B>(device)
            .unwrap();
        assert!(network.fine_field().is_none());

        let network = NerfNetworkConfig::new(field_config_small())
            .with_is_fine_shared(true)
            .init::<B>(device)
            .unwrap();
        assert!(network.fine.is_none());
        assert!(network.fine_field().is_some());

        let network = NerfNetworkConfig::new(field_config_small())
            .with_fine(Some(field_config_small()))
            .init::<B>(device)
            .unwrap();
        assert!(network.fine.is_some());

        let coarse_only = NerfNetworkConfig::new(field_config_small())
            .with_importance_sample_count(0)
            .init::<B>(device)
            .unwrap();
        let network = NerfNetworkConfig::new(field_config_small())
            .with_fine(Some(field_config_small()))
            .with_importance_sample_count(0)
            .init::<B>(device)
            .unwrap();
        assert!(network.fine.is_none());
        assert!(network.fine_field().is_none());
        assert_eq!(network.num_params(), coarse_only.num_params());
    }

    #[test]
    fn query_points() {
        let device = &Default::default();

        let network = NerfNetworkConfig::new(field_config_small())
            .with_importance_sample_count(0)
            .init::<B>(device)
            .unwrap();
        let points = Tensor::<B, 2>::random([9, 3], Distribution::Default, device);
        let output = network.query_points(points, None).unwrap();
        assert_eq!(output.dims(), [9, 4]);

        let output = network
            .query_points(Tensor::zeros([0, 3], device), None)
            .unwrap();
        assert_eq!(output.dims(), [0, 4]);

        let error = network
            .query_points(Tensor::zeros([2, 2], device), None)
            .unwrap_err();
        assert!(matches!(error, Error::Validation(..)));
    }

    #[test]
    fn scale_voxel_grids() {
        use crate::scene::bbox::BoundingBox;

        let device = &Default::default();

        let dynamic = DynamicFieldConfig::new(BoundingBox::new([-1.0; 3], [1.0; 3]))
            .with_voxel_count(2 * 2 * 2)
            .with_voxel_count_base(4 * 4 * 4)
            .with_grid_channel_count(2);
        let mut network = NerfNetworkConfig::new(field_config_small().with_dynamic(Some(dynamic)))
            .with_fine(Some(field_config_small().with_dynamic(Some(dynamic))))
            .init::<B>(device)
            .unwrap();
        let grid_size = |field: &FieldNetwork<B>| field.dynamic.as_ref().unwrap().grid.size();
        assert_eq!(grid_size(&network.coarse), [2, 2, 2]);

        network.scale_voxel_grids(4 * 4 * 4);
        assert_eq!(grid_size(&network.coarse), [4, 4, 4]);
        assert_eq!(grid_size(network.fine.as_ref().unwrap()), [4, 4, 4]);

        let points = Tensor::<B, 2>::random([5, 3], Distribution::Default, device);
        let times = Tensor::<B, 2>::zeros([5, 1], device);
        let output = network.query_points(points, Some(times)).unwrap();
        assert_eq!(output.dims(), [5, 4]);
    }
}
