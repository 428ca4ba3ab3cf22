//! Checkpoint persistence.

pub use super::*;
pub use burn::record::Record;

use crate::error::Error;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use std::path::Path;

/// The persisted training state of a [`NerfNetwork`].
///
/// The optimizer state is kept by the training loop.
#[derive(Record)]
pub struct NerfCheckpoint<B: Backend> {
    pub global_step: usize,
    pub model: NerfNetworkRecord<B>,
}

impl<B: Backend> NerfNetwork<B> {
    /// Saving the parameters and `global_step` to `path`.
    ///
    /// The file extension is replaced with `mpk`.
    pub fn save_checkpoint(
        &self,
        path: impl AsRef<Path>,
        global_step: usize,
    ) -> Result<(), Error> {
        let path = path.as_ref();

        log::info!(
            target: "stylenerf_renderer::scene",
            "NerfNetwork::save_checkpoint > path ({}), global_step ({global_step}), size ({})",
            path.display(),
            self.size_readable(),
        );

        let checkpoint = NerfCheckpoint {
            global_step,
            model: self.to_owned().into_record(),
        };
        NamedMpkFileRecorder::<FullPrecisionSettings>::new()
            .record(checkpoint, path.to_path_buf())
            .map_err(|error| Error::Record(format!("{error:?}")))
    }

    /// Loading the parameters from `path` into a network of the same configuration.
    ///
    /// It returns the network and the saved `global_step`.
    pub fn load_checkpoint(
        self,
        path: impl AsRef<Path>,
        device: &B::Device,
    ) -> Result<(Self, usize), Error> {
        let path = path.as_ref();
        let NerfCheckpoint { global_step, model } =
            NamedMpkFileRecorder::<FullPrecisionSettings>::new()
                .load::<NerfCheckpoint<B>>(path.to_path_buf(), device)
                .map_err(|error| Error::Record(format!("{error:?}")))?;

        log::info!(
            target: "stylenerf_renderer::scene",
            "NerfNetwork::load_checkpoint > path ({}), global_step ({global_step})",
            path.display(),
        );

        Ok((self.load_record(model), global_step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn config_small() -> NerfNetworkConfig {
        let field = FieldNetworkConfig::new()
            .with_depth(3)
            .with_width(16)
            .with_skips(vec![1])
            .with_position_frequency_count(4)
            .with_direction_frequency_count(2);
        NerfNetworkConfig::new(field.to_owned())
            .with_fine(Some(field.with_style(Some(StyleConfig::new(2)))))
            .with_sample_count(8)
            .with_importance_sample_count(4)
    }

    #[test]
    fn checkpoint_restores_parameters() {
        let device = &Default::default();
        let path = std::env::temp_dir().join(format!(
            "stylenerf-renderer-checkpoint-{}",
            std::process::id()
        ));

        let source = config_small().init::<B>(device).unwrap();
        source.save_checkpoint(&path, 1234).unwrap();

        let (target, global_step) = config_small()
            .init::<B>(device)
            .unwrap()
            .load_checkpoint(&path, device)
            .unwrap();
        std::fs::remove_file(path.with_extension("mpk")).ok();

        assert_eq!(global_step, 1234);
        let points = Tensor::<B, 2>::from_data(
            [[0.1, 0.2, 0.3], [-0.5, 0.4, 0.0], [0.9, -0.9, 0.2]],
            device,
        );
        source
            .query_points(points.to_owned(), None)
            .unwrap()
            .into_data()
            .assert_approx_eq(&target.query_points(points, None).unwrap().into_data(), 5);
        target
            .gamma()
            .unwrap()
            .into_data()
            .assert_eq(&source.gamma().unwrap().into_data(), true);
    }

    #[test]
    fn checkpoint_missing_file() {
        let device = &Default::default();
        let path = std::env::temp_dir().join("stylenerf-renderer-checkpoint-missing");

        let error = config_small()
            .init::<B>(device)
            .unwrap()
            .load_checkpoint(path, device)
            .unwrap_err();
        assert!(matches!(error, Error::Record(_)));
    }
}
