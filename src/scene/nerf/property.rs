pub use super::*;

use humansize::{format_size, BINARY};
use std::fmt;

impl<B: Backend> NerfNetwork<B> {
    /// Disabling the gradients of the coarse MLP.
    ///
    /// A shared fine stage is frozen as well.
    pub fn freeze_coarse(self) -> Self {
        Self {
            coarse: self.coarse.freeze_backbone(),
            ..self
        }
    }

    /// Disabling the gradients of the fine MLP.
    pub fn freeze_fine(self) -> Self {
        Self {
            fine: self.fine.map(FieldNetwork::freeze_backbone),
            ..self
        }
    }

    /// The color gate of the fine stage.
    ///
    /// It is `None` if the fine stage is not style-conditioned.
    #[inline]
    pub fn gamma(&self) -> Option<Tensor<B, 1>> {
        self.fine_field()?.gamma()
    }

    /// The density gate of the fine stage.
    ///
    /// It is `None` if the fine stage is not style-conditioned.
    #[inline]
    pub fn lemma(&self) -> Option<Tensor<B, 1>> {
        self.fine_field()?.lemma()
    }

    /// Size of the parameters in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.num_params() * size_of::<B::FloatElem>()
    }

    /// Readable size of the parameters.
    #[inline]
    pub fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }
}

impl<B: Backend> fmt::Debug for NerfNetwork<B> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct(&format!("NerfNetwork<{}>", B::name()))
            .field("coarse", &self.coarse)
            .field("fine", &self.fine)
            .field("is_fine_shared", &self.is_fine_shared)
            .field("sample_count", &self.stratified_sampler.sample_count)
            .field(
                "importance_sample_count",
                &self.importance_sampler.as_ref().map(|sampler| sampler.sample_count),
            )
            .field("size", &self.size_readable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Autodiff;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn field_config_small() -> FieldNetworkConfig {
        FieldNetworkConfig::new()
            .with_depth(3)
            .with_width(16)
            .with_skips(vec![1])
            .with_position_frequency_count(4)
            .with_direction_frequency_count(2)
    }

    #[test]
    fn gates() {
        let device = &Default::default();

        let network = NerfNetworkConfig::new(field_config_small())
            .with_fine(Some(field_config_small().with_style(Some(StyleConfig::new(2)))))
            .init::<B>(device)
            .unwrap();
        network
            .gamma()
            .unwrap()
            .into_data()
            .assert_eq(&TensorData::from([1.0f32]), true);
        network
            .lemma()
            .unwrap()
            .into_data()
            .assert_eq(&TensorData::from([1.0f32]), true);

        let network = NerfNetworkConfig::new(field_config_small())
            .with_is_fine_shared(true)
            .init::<B>(device)
            .unwrap();
        assert!(network.gamma().is_none());
        assert!(network.lemma().is_none());
    }

    #[test]
    fn size_readable() {
        let device = &Default::default();

        let network = NerfNetworkConfig::new(field_config_small())
            .with_importance_sample_count(0)
            .init::<B>(device)
            .unwrap();
        assert_eq!(network.size(), network.num_params() * 4);
        assert!(network.size_readable().ends_with("KiB"));
        assert!(format!("{network:?}").starts_with("NerfNetwork<"));
    }

    #[test]
    fn freeze_stages() {
        type AB = Autodiff<B>;
        let device = &Default::default();

        let network = NerfNetworkConfig::new(field_config_small())
            .with_fine(Some(field_config_small()))
            .init::<AB>(device)
            .unwrap()
            .freeze_coarse();

        assert!(!network.coarse.mlp.layers[0].weight.val().is_require_grad());
        let fine = network.fine.as_ref().unwrap();
        assert!(fine.mlp.layers[0].weight.val().is_require_grad());

        let network = network.freeze_fine();
        let fine = network.fine.as_ref().unwrap();
        assert!(!fine.mlp.layers[0].weight.val().is_require_grad());
    }
}
