pub use super::*;

/// The per-ray results of rendering.
///
/// If the fine stage runs, the fields are its results
/// and [`Self::coarse`] holds the results of the coarse stage.
#[derive(Clone, Debug)]
pub struct NerfRenderOutput<B: Backend> {
    /// `[R, 3]`
    pub rgb: Tensor<B, 2>,
    /// `[R]`
    pub disp: Tensor<B, 1>,
    /// `[R]`
    pub acc: Tensor<B, 1>,
    /// `[R, S]`
    pub weights: Tensor<B, 2>,
    /// `[R]`
    pub depth: Tensor<B, 1>,
    /// `[R, S, 4]`
    pub raw: Option<Tensor<B, 3>>,
    /// `[R, S, 3]`
    pub points: Option<Tensor<B, 3>>,
    /// The standard deviation of the importance depths, `[R]`.
    pub z_std: Option<Tensor<B, 1>>,
    pub coarse: Option<Box<NerfRenderOutput<B>>>,
}

impl<B: Backend> NerfRenderOutput<B> {
    /// Collecting the composited values and the optional buffers.
    pub fn new(
        composite: Composite<B>,
        raw: Option<Tensor<B, 3>>,
        points: Option<Tensor<B, 3>>,
    ) -> Self {
        let Composite {
            rgb,
            disp,
            acc,
            weights,
            depth,
        } = composite;

        Self {
            rgb,
            disp,
            acc,
            weights,
            depth,
            raw,
            points,
            z_std: None,
            coarse: None,
        }
    }

    /// The outputs of zero rays.
    pub fn empty(
        sample_count: usize,
        is_raw_returned: bool,
        is_points_returned: bool,
        device: &B::Device,
    ) -> Self {
        Self {
            rgb: Tensor::zeros([0, 3], device),
            disp: Tensor::zeros([0], device),
            acc: Tensor::zeros([0], device),
            weights: Tensor::zeros([0, sample_count], device),
            depth: Tensor::zeros([0], device),
            raw: is_raw_returned.then(|| Tensor::zeros([0, sample_count, 4], device)),
            points: is_points_returned.then(|| Tensor::zeros([0, sample_count, 3], device)),
            z_std: None,
            coarse: None,
        }
    }

    /// Attaching the coarse outputs and the deviation of the importance depths.
    pub fn with_coarse(
        mut self,
        coarse: Self,
        z_std: Tensor<B, 1>,
    ) -> Self {
        self.coarse = Some(Box::new(coarse));
        self.z_std = Some(z_std);
        self
    }

    /// Number of rays `R`.
    #[inline]
    pub fn ray_count(&self) -> usize {
        self.rgb.dims()[0]
    }

    /// The names of the present outputs.
    ///
    /// The coarse outputs are suffixed with `0`.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = ["rgb", "disp", "acc", "weights", "depth"]
            .map(String::from)
            .to_vec();
        if self.raw.is_some() {
            keys.push("raw".into());
        }
        if self.points.is_some() {
            keys.push("pts".into());
        }
        if self.z_std.is_some() {
            keys.push("z_std".into());
        }
        if let Some(coarse) = &self.coarse {
            keys.extend(coarse.keys().into_iter().map(|key| key + "0"));
        }
        keys
    }

    /// Concatenating the outputs of ray chunks in order.
    ///
    /// An optional output is kept only if every chunk has it.
    pub fn cat(mut outputs: Vec<Self>) -> Self {
        if outputs.len() == 1 {
            if let Some(output) = outputs.pop() {
                return output;
            }
        }

        let mut rgb = Vec::with_capacity(outputs.len());
        let mut disp = Vec::with_capacity(outputs.len());
        let mut acc = Vec::with_capacity(outputs.len());
        let mut weights = Vec::with_capacity(outputs.len());
        let mut depth = Vec::with_capacity(outputs.len());
        let mut raw = Some(Vec::with_capacity(outputs.len()));
        let mut points = Some(Vec::with_capacity(outputs.len()));
        let mut z_std = Some(Vec::with_capacity(outputs.len()));
        let mut coarse = Some(Vec::with_capacity(outputs.len()));

        for output in outputs {
            rgb.push(output.rgb);
            disp.push(output.disp);
            acc.push(output.acc);
            weights.push(output.weights);
            depth.push(output.depth);
            push_optional(&mut raw, output.raw);
            push_optional(&mut points, output.points);
            push_optional(&mut z_std, output.z_std);
            push_optional(&mut coarse, output.coarse.map(|coarse| *coarse));
        }

        Self {
            rgb: Tensor::cat(rgb, 0),
            disp: Tensor::cat(disp, 0),
            acc: Tensor::cat(acc, 0),
            weights: Tensor::cat(weights, 0),
            depth: Tensor::cat(depth, 0),
            raw: raw.map(|raw| Tensor::cat(raw, 0)),
            points: points.map(|points| Tensor::cat(points, 0)),
            z_std: z_std.map(|z_std| Tensor::cat(z_std, 0)),
            coarse: coarse.map(|coarse| Box::new(Self::cat(coarse))),
        }
    }
}

fn push_optional<T>(
    values: &mut Option<Vec<T>>,
    value: Option<T>,
) {
    match value {
        Some(value) => {
            if let Some(values) = values {
                values.push(value);
            }
        },
        None => *values = None,
    }
}
