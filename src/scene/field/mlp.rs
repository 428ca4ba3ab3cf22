//! Backbone and output heads of the field network.

pub use super::*;

use crate::error::Error;
use burn::nn::{Linear, LinearConfig};

/// The configuration for [`FieldMlp`].
#[derive(Config, Debug)]
pub struct FieldMlpConfig {
    /// Dimension of the backbone input.
    pub dim_input: usize,
    /// Dimension of the encoded view directions.
    ///
    /// The color head is view-conditioned if it is specified.
    pub dim_view: Option<usize>,
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
    /// Replacing the encoded view directions with zeros.
    #[config(default = false)]
    pub is_viewdir_zeroed: bool,
    /// Mixing style features into both heads.
    pub style: Option<StyleConfig>,
}

/// The MLP mapping the backbone input to raw colors and densities.
///
/// The output is `[r, g, b, sigma]` before any activation.
#[derive(Debug, Module)]
pub struct FieldMlp<B: Backend> {
    /// The backbone layers, each followed by the activation.
    pub layers: Vec<Linear<B>>,
    pub skips: Ignored<Vec<usize>>,
    pub activation: Ignored<Activation>,
    /// The view-conditioned heads.
    pub view_head: Option<ViewHead<B>>,
    /// The single head used without view directions, `W -> 4`.
    pub output: Option<Linear<B>>,
    /// Present only with a view-conditioned color head.
    pub mixer: Option<StyleMixer<B>>,
}

/// The heads splitting density from the view-conditioned color.
#[derive(Debug, Module)]
pub struct ViewHead<B: Backend> {
    /// `W -> 1`
    pub alpha: Linear<B>,
    /// `W -> W`
    pub feature: Linear<B>,
    /// `W + V -> W / 2`
    pub views: Linear<B>,
    /// `W / 2 -> 3`
    pub rgb: Linear<B>,
    pub is_viewdir_zeroed: bool,
}

impl FieldMlpConfig {
    /// Initialize from the configuration.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> Result<FieldMlp<B>, Error> {
        let activation = self.activation.parse::<Activation>()?;

        if self.depth == 0 || self.width < 2 {
            return Err(Error::Configuration(format!(
                "the backbone depth {} and width {} are too small",
                self.depth, self.width
            )));
        }
        if let Some(skip) = self.skips.iter().find(|skip| **skip + 1 >= self.depth) {
            return Err(Error::Configuration(format!(
                "the skip index {skip} should be less than {}",
                self.depth - 1
            )));
        }
        if self.style.is_some() && self.dim_view.is_none() {
            return Err(Error::Configuration(
                "style mixing requires view directions".into(),
            ));
        }

        let width = self.width;
        let layers = (0..self.depth)
            .map(|index| {
                let dim_input = match index {
                    0 => self.dim_input,
                    _ if self.skips.contains(&(index - 1)) => width + self.dim_input,
                    _ => width,
                };
                LinearConfig::new(dim_input, width).init(device)
            })
            .collect();

        let view_head = self.dim_view.map(|dim_view| ViewHead {
            alpha: LinearConfig::new(width, 1).init(device),
            feature: LinearConfig::new(width, width).init(device),
            views: LinearConfig::new(width + dim_view, width / 2).init(device),
            rgb: LinearConfig::new(width / 2, 3).init(device),
            is_viewdir_zeroed: self.is_viewdir_zeroed,
        });
        let output = self
            .dim_view
            .is_none()
            .then(|| LinearConfig::new(width, 4).init(device));
        let mixer = self
            .style
            .map(|style| style.init_mixer(width, activation, device));

        Ok(FieldMlp {
            layers,
            skips: Ignored(self.skips.to_owned()),
            activation: Ignored(activation),
            view_head,
            output,
            mixer,
        })
    }
}

impl<B: Backend> FieldMlp<B> {
    /// Computing the raw output.
    ///
    /// ## Arguments
    ///
    /// * `views` - The encoded view directions, required by a view-conditioned head.
    /// * `style_features` - Mixed into both heads if the mixer is present.
    ///
    /// ## Shapes
    ///
    /// * `input` - `[N, F]`
    /// * `views` - `[N, V]`
    /// * `style_features` - `[N, W]`
    /// * `output` - `[N, 4]`
    pub fn forward(
        &self,
        input: Tensor<B, 2>,
        views: Option<Tensor<B, 2>>,
        style_features: Option<Tensor<B, 2>>,
    ) -> Result<Tensor<B, 2>, Error> {
        let activation = *self.activation;

        let mut hidden = input.to_owned();
        for (index, layer) in self.layers.iter().enumerate() {
            hidden = activation.forward(layer.forward(hidden));
            if self.skips.contains(&index) {
                hidden = Tensor::cat(vec![input.to_owned(), hidden], 1);
            }
        }

        let head = match (&self.view_head, &self.output) {
            (Some(head), _) => head,
            (None, Some(output)) => return Ok(output.forward(hidden)),
            (None, None) => {
                return Err(Error::Configuration(
                    "the field network has no output head".into(),
                ))
            },
        };
        let views = views.ok_or_else(|| {
            Error::Validation(
                "the encoded view directions".into(),
                "given to a view-conditioned field".into(),
            )
        })?;
        let views = if head.is_viewdir_zeroed {
            views.zeros_like()
        } else {
            views
        };

        // [N, 1]
        let mut alpha = head.alpha.forward(hidden.to_owned());
        // [N, W]
        let mut feature = head.feature.forward(hidden.to_owned());

        if let (Some(mixer), Some(style_features)) = (&self.mixer, style_features) {
            alpha = mixer.forward_density(hidden, alpha, style_features.to_owned());
            feature = mixer.forward_color(feature, style_features);
        }

        let hidden = activation.forward(head.views.forward(Tensor::cat(vec![feature, views], 1)));
        let rgb = head.rgb.forward(hidden);

        Ok(Tensor::cat(vec![rgb, alpha], 1))
    }

    /// The color gate of the style mixer.
    #[inline]
    pub fn gamma(&self) -> Option<Tensor<B, 1>> {
        self.mixer.as_ref().map(|mixer| mixer.gamma.val())
    }

    /// The density gate of the style mixer.
    #[inline]
    pub fn lemma(&self) -> Option<Tensor<B, 1>> {
        self.mixer.as_ref().map(|mixer| mixer.lemma.val())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn init_skip_layers() {
        let device = &Default::default();

        let mlp = FieldMlpConfig::new(63)
            .with_dim_view(Some(27))
            .with_width(32)
            .init::<B>(device)
            .unwrap();
        let dims = mlp
            .layers
            .iter()
            .map(|layer| layer.weight.dims())
            .collect::<Vec<_>>();
        assert_eq!(dims[0], [63, 32]);
        assert_eq!(dims[4], [32, 32]);
        assert_eq!(dims[5], [95, 32]);
        assert_eq!(dims[7], [32, 32]);
        assert!(mlp.output.is_none());

        let head = mlp.view_head.unwrap();
        assert_eq!(head.views.weight.dims(), [59, 16]);
        assert_eq!(head.rgb.weight.dims(), [16, 3]);
    }

    #[test]
    fn init_invalid() {
        let device = &Default::default();

        let error = FieldMlpConfig::new(63)
            .with_depth(5)
            .with_skips(vec![4])
            .init::<B>(device)
            .unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));

        let error = FieldMlpConfig::new(63)
            .with_activation("softmax".into())
            .init::<B>(device)
            .unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));

        let error = FieldMlpConfig::new(63)
            .with_style(Some(StyleConfig::new(2)))
            .init::<B>(device)
            .unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));
    }

    #[test]
    fn forward_shapes() {
        let device = &Default::default();
        let input = Tensor::<B, 2>::ones([10, 63], device);

        let mlp = FieldMlpConfig::new(63)
            .with_depth(3)
            .with_width(16)
            .with_skips(vec![1])
            .init::<B>(device)
            .unwrap();
        let output = mlp.forward(input.to_owned(), None, None).unwrap();
        assert_eq!(output.dims(), [10, 4]);

        let mlp = FieldMlpConfig::new(63)
            .with_dim_view(Some(27))
            .with_depth(3)
            .with_width(16)
            .with_skips(vec![1])
            .with_style(Some(StyleConfig::new(2)))
            .init::<B>(device)
            .unwrap();
        let views = Tensor::<B, 2>::ones([10, 27], device);
        let style_features = Tensor::<B, 2>::ones([10, 16], device);
        let output = mlp
            .forward(input.to_owned(), Some(views), Some(style_features))
            .unwrap();
        assert_eq!(output.dims(), [10, 4]);

        let error = mlp.forward(input, None, None).unwrap_err();
        assert!(matches!(error, Error::Validation(..)));
    }

    #[test]
    fn forward_with_zeroed_views() {
        let device = &Default::default();
        let input = Tensor::<B, 2>::ones([4, 9], device);

        let mlp = FieldMlpConfig::new(9)
            .with_dim_view(Some(6))
            .with_depth(2)
            .with_width(8)
            .with_skips(vec![])
            .with_is_viewdir_zeroed(true)
            .init::<B>(device)
            .unwrap();
        let views = Tensor::<B, 2>::random([4, 6], burn::tensor::Distribution::Default, device);
        let output = mlp.forward(input.to_owned(), Some(views), None).unwrap();
        let target = mlp
            .forward(input, Some(Tensor::zeros([4, 6], device)), None)
            .unwrap();
        output.into_data().assert_eq(&target.into_data(), true);
    }
}
