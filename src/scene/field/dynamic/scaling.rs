//! Progressive scaling of voxel grids.

pub use super::*;

/// The schedule growing the voxel count during training.
///
/// The grid starts at `voxel_count / 2^len(steps)` voxels
/// and doubles at each step, reaching `voxel_count` after the last one.
#[derive(Config, Debug, PartialEq)]
pub struct ProgressiveScaling {
    /// The final number of voxels.
    #[config(default = 1_000_000)]
    pub voxel_count: usize,
    /// The global steps at which the voxel count doubles.
    #[config(default = "Vec::new()")]
    pub steps: Vec<usize>,
}

impl ProgressiveScaling {
    /// The voxel count to initialize the grids with.
    #[inline]
    pub fn voxel_count_initial(&self) -> usize {
        self.voxel_count >> self.steps.len().min(usize::BITS as usize - 1)
    }

    /// The voxel count in effect after `global_step`.
    pub fn voxel_count_at(
        &self,
        global_step: usize,
    ) -> usize {
        let step_count = self.steps.iter().filter(|step| **step <= global_step).count();
        self.voxel_count_initial() << step_count
    }

    /// The new voxel count if the grids should be scaled at `global_step`.
    pub fn scaling_at(
        &self,
        global_step: usize,
    ) -> Option<usize> {
        self.steps
            .contains(&global_step)
            .then(|| self.voxel_count_at(global_step))
    }
}
