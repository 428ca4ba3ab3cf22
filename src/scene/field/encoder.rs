//! Positional encoding.

pub use super::*;

/// The configuration for [`PositionalEncoder`].
#[derive(Config, Copy, Debug, PartialEq)]
pub struct PositionalEncoderConfig {
    /// Number of frequency bands `L`.
    pub frequency_count: usize,
    /// Prefixing the raw input.
    #[config(default = true)]
    pub is_input_included: bool,
    /// Applying the periodic functions.
    ///
    /// If it is `false`, the encoder only passes the raw input through.
    #[config(default = true)]
    pub is_periodic: bool,
}

/// Frequency-based feature expansion of coordinates.
///
/// `[x, sin(2^0 x), cos(2^0 x), ..., sin(2^(L-1) x), cos(2^(L-1) x)]`
///
/// ## Details
///
/// The encoder has no learned state.
#[derive(Clone, Debug, Module)]
pub struct PositionalEncoder {
    pub frequency_count: usize,
    pub is_input_included: bool,
    pub is_periodic: bool,
}

impl PositionalEncoderConfig {
    /// Initialize from the configuration.
    pub fn init(&self) -> PositionalEncoder {
        PositionalEncoder {
            frequency_count: self.frequency_count,
            is_input_included: self.is_input_included,
            is_periodic: self.is_periodic,
        }
    }
}

impl PositionalEncoder {
    /// The output dimension for the input dimension `dim_input`.
    #[inline]
    pub fn dim_output(
        &self,
        dim_input: usize,
    ) -> usize {
        let band_count = if self.is_periodic {
            2 * self.frequency_count
        } else {
            0
        };
        dim_input * (self.is_input_included as usize + band_count)
    }

    /// Encoding the input tensor.
    ///
    /// ## Shapes
    ///
    /// * `input` - `[..., D]`
    /// * `output` - [`[..., D']`](Self::dim_output)
    pub fn forward<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
    ) -> Tensor<B, D> {
        let mut features = Vec::with_capacity(1 + 2 * self.frequency_count);

        if self.is_input_included {
            features.push(input.to_owned());
        }
        if self.is_periodic {
            for index in 0..self.frequency_count {
                let input_scaled = input.to_owned().mul_scalar(2.0_f32.powi(index as i32));
                features.push(input_scaled.to_owned().sin());
                features.push(input_scaled.cos());
            }
        }

        if features.is_empty() {
            let mut dims = input.dims();
            dims[D - 1] = 0;
            return Tensor::zeros(dims, &input.device());
        }

        Tensor::cat(features, D - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn dim_output() {
        let device = &Default::default();

        for dim_input in [1, 3] {
            for frequency_count in [0, 4, 10] {
                let encoder = PositionalEncoderConfig::new(frequency_count).init();
                let input = Tensor::<B, 2>::ones([5, dim_input], device);
                let output = encoder.forward(input);
                let dim_output = dim_input * (1 + 2 * frequency_count);
                assert_eq!(encoder.dim_output(dim_input), dim_output);
                assert_eq!(output.dims(), [5, dim_output]);
            }
        }
    }

    #[test]
    fn dim_output_without_input() {
        let device = &Default::default();

        let encoder = PositionalEncoderConfig::new(4)
            .with_is_input_included(false)
            .init();
        let output = encoder.forward(Tensor::<B, 3>::ones([2, 7, 3], device));
        assert_eq!(encoder.dim_output(3), 24);
        assert_eq!(output.dims(), [2, 7, 24]);

        let encoder = PositionalEncoderConfig::new(4).with_is_periodic(false).init();
        let output = encoder.forward(Tensor::<B, 2>::ones([2, 3], device));
        assert_eq!(encoder.dim_output(3), 3);
        assert_eq!(output.dims(), [2, 3]);
    }

    #[test]
    fn forward_values() {
        let device = &Default::default();

        let encoder = PositionalEncoderConfig::new(2).init();
        let x = 0.3_f32;
        let output = encoder
            .forward(Tensor::<B, 2>::from_data([[x]], device))
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        let target = [x, x.sin(), x.cos(), (2.0 * x).sin(), (2.0 * x).cos()];
        for (output, target) in output.iter().zip(target) {
            assert!((output - target).abs() < 1e-6, "{output} != {target}");
        }
    }

    #[test]
    fn forward_with_many_bands() {
        let device = &Default::default();

        let encoder = PositionalEncoderConfig::new(33).init();
        let output = encoder.forward(Tensor::<B, 2>::ones([1, 1], device));
        assert_eq!(output.dims(), [1, encoder.dim_output(1)]);
        assert_eq!(encoder.dim_output(1), 67);

        let output = output.into_data().to_vec::<f32>().unwrap();
        assert!(output.iter().all(|value| value.is_finite()));
        let x = 2.0_f32.powi(32);
        assert!((output[65] - x.sin()).abs() < 1e-4, "{} != {}", output[65], x.sin());
    }
}
