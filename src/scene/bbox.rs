//! Axis-aligned bounding box.

pub use super::*;

use crate::error::Error;

/// An axis-aligned bounding box in world space.
#[derive(Config, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// `(x, y, z)`
    pub min: [f32; 3],
    /// `(x, y, z)`
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Extents along each axis.
    #[inline]
    pub fn extents(&self) -> [f32; 3] {
        [0, 1, 2].map(|axis| self.max[axis] - self.min[axis])
    }

    /// Volume of the box.
    #[inline]
    pub fn volume(&self) -> f32 {
        self.extents().iter().product()
    }

    /// Checking that every extent is positive and finite.
    pub fn validate(&self) -> Result<&Self, Error> {
        if self
            .extents()
            .iter()
            .all(|extent| extent.is_finite() && *extent > 0.0)
        {
            Ok(self)
        } else {
            Err(Error::Configuration(format!(
                "the bounding box {self:?} should have positive extents"
            )))
        }
    }

    /// The box enclosing every ray segment from `near` to `far`.
    ///
    /// The directions are normalized before stepping.
    ///
    /// ## Shapes
    ///
    /// * `origins` - `[N, 3]`
    /// * `directions` - `[N, 3]`
    /// * `near` - `[N]`
    /// * `far` - `[N]`
    pub fn from_rays<B: Backend>(
        origins: Tensor<B, 2>,
        directions: Tensor<B, 2>,
        near: Tensor<B, 1>,
        far: Tensor<B, 1>,
    ) -> Result<Self, Error> {
        let [ray_count, _] = origins.dims();
        if ray_count == 0 {
            return Err(Error::Validation(
                "the ray count".into(),
                "at least 1".into(),
            ));
        }
        if directions.dims() != [ray_count, 3] {
            return Err(Error::Validation(
                format!("the shape of directions {:?}", directions.dims()),
                format!("{:?}", [ray_count, 3]),
            ));
        }

        // [N, 3]
        let directions = directions.to_owned().div(
            directions
                .powf_scalar(2.0)
                .sum_dim(1)
                .sqrt()
                .expand([ray_count, 3]),
        );
        // [2 * N, 3]
        let points = Tensor::cat(
            vec![
                origins.to_owned()
                    + directions.to_owned() * near.reshape([ray_count, 1]),
                origins + directions * far.reshape([ray_count, 1]),
            ],
            0,
        );

        let min = points.to_owned().min_dim(0).into_data().to_vec::<f32>();
        let max = points.max_dim(0).into_data().to_vec::<f32>();
        let (min, max) = match (min, max) {
            (Ok(min), Ok(max)) if min.len() == 3 && max.len() == 3 => (min, max),
            _ => {
                return Err(Error::Validation(
                    "the ray bounds".into(),
                    "readable as 32-bit floats".into(),
                ))
            },
        };

        Ok(Self {
            min: [min[0], min[1], min[2]],
            max: [max[0], max[1], max[2]],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn from_rays() {
        let device = &Default::default();

        let origins = Tensor::<B, 2>::from_data([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], device);
        let directions =
            Tensor::<B, 2>::from_data([[0.0, 0.0, 2.0], [0.0, -3.0, 0.0]], device);
        let near = Tensor::<B, 1>::from_data([1.0, 1.0], device);
        let far = Tensor::<B, 1>::from_data([4.0, 2.0], device);

        let bbox = BoundingBox::from_rays(origins, directions, near, far).unwrap();
        assert_eq!(bbox.min, [0.0, -2.0, 0.0]);
        assert_eq!(bbox.max, [1.0, 0.0, 4.0]);
        assert_eq!(bbox.extents(), [1.0, 2.0, 4.0]);
        assert_eq!(bbox.volume(), 8.0);
        assert!(bbox.validate().is_ok());
    }

    #[test]
    fn validate_degenerate() {
        let bbox = BoundingBox::new([0.0, 0.0, 0.0], [1.0, 0.0, 1.0]);
        assert!(matches!(bbox.validate(), Err(Error::Configuration(_))));
    }
}
