//! Style conditioning of the field network.

pub use super::*;

use crate::error::Error;
use burn::{
    nn::{Linear, LinearConfig},
    tensor::activation,
};

/// The configuration of style conditioning.
#[derive(Config, Copy, Debug, PartialEq)]
pub struct StyleConfig {
    /// Number of style identities `K`.
    pub style_count: usize,
    /// Number of linear layers of the style embedder.
    #[config(default = 4)]
    pub depth: usize,
    /// Feeding the encoded points to the style embedder.
    #[config(default = false)]
    pub is_position_embedded: bool,
}

/// The conditioning vector selecting or blending style identities.
///
/// It is constant for a whole render call.
#[derive(Clone, Debug)]
pub struct StyleVector<B: Backend> {
    /// `[K]`
    pub weights: Tensor<B, 1>,
}

/// Mapping a style vector to style features.
///
/// Every layer is followed by a ReLU.
#[derive(Debug, Module)]
pub struct StyleEmbedder<B: Backend> {
    pub layers: Vec<Linear<B>>,
    pub is_position_embedded: bool,
}

/// Blending style features into the density and color branches.
///
/// * `alpha' = lemma * alpha + (1 - lemma) * D(h, s)`
/// * `feature' = gamma * feature + (1 - gamma) * R(feature, s)`
#[derive(Debug, Module)]
pub struct StyleMixer<B: Backend> {
    /// The density mixing layers, `2W -> W -> 1`.
    pub density_layers: Vec<Linear<B>>,
    /// The color mixing layers, `2W -> W -> W -> W -> W`.
    pub color_layers: Vec<Linear<B>>,
    /// The color gate, `[1]`.
    pub gamma: Param<Tensor<B, 1>>,
    /// The density gate, `[1]`.
    pub lemma: Param<Tensor<B, 1>>,
    pub activation: Ignored<Activation>,
}

impl<B: Backend> StyleVector<B> {
    /// Selecting the style at `index` among `count` styles.
    pub fn one_hot(
        index: usize,
        count: usize,
        device: &B::Device,
    ) -> Result<Self, Error> {
        if index >= count {
            return Err(Error::Validation(
                format!("the style index {index}"),
                format!("less than {count}"),
            ));
        }

        let mut weights = vec![0.0f32; count];
        weights[index] = 1.0;
        Ok(Self {
            weights: Tensor::from_data(TensorData::new(weights, [count]), device),
        })
    }

    /// Blending the styles with non-negative `weights`, normalized to sum to 1.
    pub fn blend(
        weights: &[f32],
        device: &B::Device,
    ) -> Result<Self, Error> {
        let total = weights.iter().sum::<f32>();
        if weights.iter().any(|weight| !weight.is_finite() || *weight < 0.0)
            || total <= 0.0
        {
            return Err(Error::Validation(
                format!("the style weights {weights:?}"),
                "non-negative with a positive sum".into(),
            ));
        }

        let weights = weights.iter().map(|weight| weight / total).collect::<Vec<_>>();
        let count = weights.len();
        Ok(Self {
            weights: Tensor::from_data(TensorData::new(weights, [count]), device),
        })
    }

    /// Number of style identities `K`.
    #[inline]
    pub fn style_count(&self) -> usize {
        self.weights.dims()[0]
    }
}

impl StyleConfig {
    /// Initialize the style embedder.
    ///
    /// * `dim_position` is the dimension of the encoded points.
    pub fn init_embedder<B: Backend>(
        &self,
        width: usize,
        dim_position: usize,
        device: &B::Device,
    ) -> Result<StyleEmbedder<B>, Error> {
        if self.style_count == 0 {
            return Err(Error::Configuration(
                "the style count should be positive".into(),
            ));
        }
        let depth_min = if self.is_position_embedded { 2 } else { 1 };
        if self.depth < depth_min {
            return Err(Error::Configuration(format!(
                "the style embedder depth {} should be at least {depth_min}",
                self.depth
            )));
        }

        let style_count = self.style_count;
        let layers = (0..self.depth)
            .map(|index| {
                let dim_input = match (index, self.is_position_embedded) {
                    (0, _) => style_count,
                    (1, true) => width + dim_position + style_count,
                    (_, true) => width + style_count,
                    (_, false) => width,
                };
                LinearConfig::new(dim_input, width).init(device)
            })
            .collect();

        Ok(StyleEmbedder {
            layers,
            is_position_embedded: self.is_position_embedded,
        })
    }

    /// Initialize the style mixer.
    pub fn init_mixer<B: Backend>(
        &self,
        width: usize,
        activation: Activation,
        device: &B::Device,
    ) -> StyleMixer<B> {
        let density_layers = vec![
            LinearConfig::new(2 * width, width).init(device),
            LinearConfig::new(width, 1).init(device),
        ];
        let color_layers = [2 * width, width, width, width]
            .into_iter()
            .map(|dim_input| LinearConfig::new(dim_input, width).init(device))
            .collect();
        let gamma = Param::uninitialized(
            Default::default(),
            |device, is_require_grad| {
                Tensor::ones([1], device).set_require_grad(is_require_grad)
            },
            device.to_owned(),
            true,
        );
        let lemma = Param::uninitialized(
            Default::default(),
            |device, is_require_grad| {
                Tensor::ones([1], device).set_require_grad(is_require_grad)
            },
            device.to_owned(),
            true,
        );

        StyleMixer {
            density_layers,
            color_layers,
            gamma,
            lemma,
            activation: Ignored(activation),
        }
    }
}

impl<B: Backend> StyleEmbedder<B> {
    /// Embedding the style vector.
    ///
    /// ## Shapes
    ///
    /// * `style` - `[K]`
    /// * `points_encoded` - `[N, P]`
    /// * `output` - `[N, W]`
    pub fn forward(
        &self,
        style: &StyleVector<B>,
        points_encoded: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let [point_count, _] = points_encoded.dims();
        let style_count = style.style_count();
        let style = style.weights.to_owned().reshape([1, style_count]);

        if !self.is_position_embedded {
            // Independent of the points, so it is computed once and broadcast.
            let features = self
                .layers
                .iter()
                .fold(style, |hidden, layer| activation::relu(layer.forward(hidden)));
            let width = features.dims()[1];
            return features.expand([point_count, width]);
        }

        // [N, K]
        let style = style.expand([point_count, style_count]);
        let mut hidden = style.to_owned();
        for (index, layer) in self.layers.iter().enumerate() {
            let input = match index {
                0 => hidden,
                1 => Tensor::cat(vec![hidden, points_encoded.to_owned(), style.to_owned()], 1),
                _ => Tensor::cat(vec![hidden, style.to_owned()], 1),
            };
            hidden = activation::relu(layer.forward(input));
        }
        hidden
    }
}

impl<B: Backend> StyleMixer<B> {
    /// Mixing the raw density.
    ///
    /// ## Shapes
    ///
    /// * `hidden` - `[N, W]`
    /// * `alpha` - `[N, 1]`
    /// * `style_features` - `[N, W]`
    /// * `output` - `[N, 1]`
    pub fn forward_density(
        &self,
        hidden: Tensor<B, 2>,
        alpha: Tensor<B, 2>,
        style_features: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let mixed = Self::forward_layers(
            &self.density_layers,
            *self.activation,
            Tensor::cat(vec![hidden, style_features], 1),
        );
        Self::gate(self.lemma.val(), alpha, mixed)
    }

    /// Mixing the color feature.
    ///
    /// ## Shapes
    ///
    /// * `feature` - `[N, W]`
    /// * `style_features` - `[N, W]`
    /// * `output` - `[N, W]`
    pub fn forward_color(
        &self,
        feature: Tensor<B, 2>,
        style_features: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let mixed = Self::forward_layers(
            &self.color_layers,
            *self.activation,
            Tensor::cat(vec![feature.to_owned(), style_features], 1),
        );
        Self::gate(self.gamma.val(), feature, mixed)
    }

    /// Every layer but the last is activated.
    fn forward_layers(
        layers: &[Linear<B>],
        activation: Activation,
        input: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let last = layers.len() - 1;
        layers.iter().enumerate().fold(input, |hidden, (index, layer)| {
            let hidden = layer.forward(hidden);
            if index < last {
                activation.forward(hidden)
            } else {
                hidden
            }
        })
    }

    /// `gate * original + (1 - gate) * mixed`
    fn gate(
        gate: Tensor<B, 1>,
        original: Tensor<B, 2>,
        mixed: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let gate = gate.reshape([1, 1]);
        original * gate.to_owned() + mixed * gate.neg().add_scalar(1.0)
    }
}
