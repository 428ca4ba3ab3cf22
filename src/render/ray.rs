//! Ray batches.

pub use crate::scene::field::StyleVector;
pub use burn::tensor::{backend::Backend, Tensor};

use crate::error::Error;
use burn::tensor::ElementConversion;

/// The depth limits of rays.
#[derive(Clone, Debug)]
pub enum RayBounds<B: Backend> {
    /// The same limits for every ray.
    Constant { near: f32, far: f32 },
    /// Limits per ray.
    PerRay {
        /// `[N, 1]`
        near: Tensor<B, 2>,
        /// `[N, 1]`
        far: Tensor<B, 2>,
    },
}

/// A batch of independent rays.
#[derive(Clone, Debug)]
pub struct RayBatch<B: Backend> {
    /// `[N, 3]`
    pub origins: Tensor<B, 2>,
    /// `[N, 3]`
    ///
    /// They are not normalized, so that the depths scale with their norms.
    pub directions: Tensor<B, 2>,
    pub bounds: RayBounds<B>,
    /// `[N, 1]`
    pub times: Option<Tensor<B, 2>>,
    /// Constant for the whole batch.
    pub style: Option<StyleVector<B>>,
}

impl<B: Backend> RayBatch<B> {
    pub fn new(
        origins: Tensor<B, 2>,
        directions: Tensor<B, 2>,
        bounds: RayBounds<B>,
    ) -> Self {
        Self {
            origins,
            directions,
            bounds,
            times: None,
            style: None,
        }
    }

    pub fn with_times(
        mut self,
        times: Tensor<B, 2>,
    ) -> Self {
        self.times = Some(times);
        self
    }

    pub fn with_style(
        mut self,
        style: StyleVector<B>,
    ) -> Self {
        self.style = Some(style);
        self
    }

    /// Number of rays `N`.
    #[inline]
    pub fn ray_count(&self) -> usize {
        self.origins.dims()[0]
    }

    /// Unit view directions.
    ///
    /// ## Shapes
    ///
    /// * `output` - `[N, 3]`
    pub fn view_directions(&self) -> Tensor<B, 2> {
        let [ray_count, _] = self.directions.dims();
        self.directions.to_owned().div(
            self.directions
                .to_owned()
                .powf_scalar(2.0)
                .sum_dim(1)
                .sqrt()
                .expand([ray_count, 3]),
        )
    }

    /// The depth limits broadcast to every ray.
    ///
    /// ## Shapes
    ///
    /// * `output` - `([N, 1], [N, 1])`
    pub fn near_far(&self) -> (Tensor<B, 2>, Tensor<B, 2>) {
        match &self.bounds {
            RayBounds::Constant { near, far } => {
                let device = self.origins.device();
                let ray_count = self.ray_count();
                (
                    Tensor::ones([ray_count, 1], &device).mul_scalar(*near),
                    Tensor::ones([ray_count, 1], &device).mul_scalar(*far),
                )
            },
            RayBounds::PerRay { near, far } => (near.to_owned(), far.to_owned()),
        }
    }

    /// Checking the shapes, the directions and the depth limits.
    ///
    /// Every direction should have a positive norm.
    /// `is_near_positive` is required by sampling in inverse depth.
    pub fn validate(
        &self,
        is_near_positive: bool,
    ) -> Result<&Self, Error> {
        let ray_count = self.ray_count();

        check_dims(self.origins.dims(), [ray_count, 3], "origins")?;
        check_dims(self.directions.dims(), [ray_count, 3], "directions")?;
        if let Some(times) = &self.times {
            check_dims(times.dims(), [ray_count, 1], "times")?;
        }
        if ray_count > 0 {
            let norm_squared_min = self
                .directions
                .to_owned()
                .powf_scalar(2.0)
                .sum_dim(1)
                .min()
                .into_scalar()
                .elem::<f32>();
            if !(norm_squared_min > 0.0) {
                return Err(Error::Validation(
                    "the norm of every direction".into(),
                    "positive".into(),
                ));
            }
        }

        match &self.bounds {
            RayBounds::Constant { near, far } => {
                if far.partial_cmp(near) != Some(std::cmp::Ordering::Greater) {
                    return Err(Error::Validation(
                        format!("the far bound {far}"),
                        format!("greater than the near bound {near}"),
                    ));
                }
                if is_near_positive && *near <= 0.0 {
                    return Err(Error::Validation(
                        format!("the near bound {near}"),
                        "positive".into(),
                    ));
                }
            },
            RayBounds::PerRay { near, far } => {
                check_dims(near.dims(), [ray_count, 1], "near bounds")?;
                check_dims(far.dims(), [ray_count, 1], "far bounds")?;
                if ray_count == 0 {
                    return Ok(self);
                }

                let gap_min = (far.to_owned() - near.to_owned())
                    .min()
                    .into_scalar()
                    .elem::<f32>();
                if !(gap_min > 0.0) {
                    return Err(Error::Validation(
                        "every far bound".into(),
                        "greater than its near bound".into(),
                    ));
                }
                if is_near_positive && !(near.to_owned().min().into_scalar().elem::<f32>() > 0.0) {
                    return Err(Error::Validation(
                        "every near bound".into(),
                        "positive".into(),
                    ));
                }
            },
        }

        Ok(self)
    }
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
