use burn::tensor::{backend, Float, Tensor};

pub trait TensorFloatExtension<const D: usize> {
    fn prod_cumulative_exclusive(
        self,
        dim: usize,
    ) -> Self;

    fn sum_cumulative(
        self,
        dim: usize,
    ) -> Self;

    /// Population standard deviation along `dim`, keeping the dimension.
    fn std_dim(
        self,
        dim: usize,
    ) -> Self;
}

impl<B: backend::Backend, const D: usize> TensorFloatExtension<D>
    for Tensor<B, D, Float>
{
    fn prod_cumulative_exclusive(
        self,
        dim: usize,
    ) -> Self {
        assert!(dim < D, "dim should be less than self.dims().len()");

        let mut result = self.to_owned();

        let dims_batch = {
            let mut dims = self.dims();
            dims[dim] = 1;
            dims
        };
        let mut state_batch = Tensor::ones(dims_batch, &self.device());
        let mut ranges_batch = dims_batch.map(|dim| 0..dim);

        for (index, value_batch) in self.iter_dim(dim).enumerate() {
            ranges_batch[dim] = index..(index + 1);
            result = result
                .slice_assign(ranges_batch.to_owned(), state_batch.to_owned());
            state_batch = state_batch * value_batch;
        }

        result
    }

    fn sum_cumulative(
        self,
        dim: usize,
    ) -> Self {
        assert!(dim < D, "dim should be less than self.dims().len()");

        let mut result = self.to_owned();

        let dims_batch = {
            let mut dims = self.dims();
            dims[dim] = 1;
            dims
        };
        let mut state_batch = Tensor::zeros(dims_batch, &self.device());
        let mut ranges_batch = dims_batch.map(|dim| 0..dim);

        for (index, value_batch) in self.iter_dim(dim).enumerate() {
            ranges_batch[dim] = index..(index + 1);
            state_batch = state_batch + value_batch;
            result = result
                .slice_assign(ranges_batch.to_owned(), state_batch.to_owned());
        }

        result
    }

    fn std_dim(
        self,
        dim: usize,
    ) -> Self {
        let mean = self.to_owned().mean_dim(dim);
        (self - mean).powf_scalar(2.0).mean_dim(dim).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn prod_cumulative_exclusive() {
        let device = &Default::default();

        let input =
            Tensor::<B, 2>::from_data([[2.0, 3.0, 4.0], [0.5, 0.0, 8.0]], device);
        let output = input.prod_cumulative_exclusive(1);
        let target =
            Tensor::<B, 2>::from_data([[1.0, 2.0, 6.0], [1.0, 0.5, 0.0]], device);
        output.into_data().assert_eq(&target.into_data(), true);
    }

    #[test]
    fn sum_cumulative() {
        let device = &Default::default();

        let input =
            Tensor::<B, 2>::from_data([[1.0, 2.0, 3.0], [0.5, 0.25, 0.25]], device);
        let output = input.sum_cumulative(1);
        let target =
            Tensor::<B, 2>::from_data([[1.0, 3.0, 6.0], [0.5, 0.75, 1.0]], device);
        output.into_data().assert_eq(&target.into_data(), true);
    }

    #[test]
    fn std_dim() {
        let device = &Default::default();

        let input =
            Tensor::<B, 2>::from_data([[1.0, 1.0, 1.0, 1.0], [2.0, 4.0, 4.0, 6.0]], device);
        let output = input.std_dim(1).into_data().to_vec::<f32>().unwrap();
        assert_eq!(output.len(), 2);
        assert!(output[0].abs() < 1e-6);
        assert!((output[1] - 2.0_f32.sqrt()).abs() < 1e-6);
    }
}
