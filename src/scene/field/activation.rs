//! Activation functions of the field networks.

pub use super::*;

use crate::error::Error;
use burn::tensor::activation;
use std::str::FromStr;

/// The supported activation functions.
///
/// Names are resolved by [`FromStr`], so unknown names are rejected
/// when the configuration is initialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Activation {
    #[default]
    Relu,
    Silu,
    Mish,
    Gelu,
}

impl Activation {
    /// The function of the activation.
    #[inline]
    pub fn function<B: Backend, const D: usize>(self) -> fn(Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Self::Relu => activation::relu,
            Self::Silu => activation::silu,
            Self::Mish => activation::mish,
            Self::Gelu => activation::gelu,
        }
    }

    #[inline]
    pub fn forward<B: Backend, const D: usize>(
        self,
        input: Tensor<B, D>,
    ) -> Tensor<B, D> {
        self.function()(input)
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "relu" => Ok(Self::Relu),
            "silu" => Ok(Self::Silu),
            "mish" => Ok(Self::Mish),
            "gelu" => Ok(Self::Gelu),
            _ => Err(Error::Configuration(format!(
                "unknown activation function {name:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn from_str() {
        assert_eq!("relu".parse::<Activation>().unwrap(), Activation::Relu);
        assert_eq!("SiLU".parse::<Activation>().unwrap(), Activation::Silu);
        assert_eq!("mish".parse::<Activation>().unwrap(), Activation::Mish);
        assert_eq!("GELU".parse::<Activation>().unwrap(), Activation::Gelu);

        let error = "tanh".parse::<Activation>().unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));
    }

    #[test]
    fn forward_relu() {
        let device = &Default::default();

        let input = Tensor::<B, 1>::from_data([-1.0, 0.0, 2.0], device);
        let output = Activation::Relu.forward(input);
        output
            .into_data()
            .assert_eq(&Tensor::<B, 1>::from_data([0.0, 0.0, 2.0], device).into_data(), true);
    }
}
