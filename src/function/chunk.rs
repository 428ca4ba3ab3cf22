//! Chunked evaluation over the leading dimension.

pub use burn::tensor::{backend::Backend, Tensor};

use crate::error::Error;
use std::ops::Range;

/// The context carried through the chunking and unchunking boundary.
///
/// It keeps the original batch size, so that the joined outputs can be checked
/// against it regardless of the chunk size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkContext {
    /// The size of the leading dimension before chunking.
    pub batch_size: usize,
    /// The maximum size of each chunk.
    pub chunk_size: usize,
}

impl ChunkContext {
    pub fn new(
        batch_size: usize,
        chunk_size: usize,
    ) -> Result<Self, Error> {
        if chunk_size == 0 {
            return Err(Error::Validation(
                "chunk_size".into(),
                "at least 1".into(),
            ));
        }

        Ok(Self {
            batch_size,
            chunk_size,
        })
    }

    /// Number of chunks.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.batch_size.div_ceil(self.chunk_size)
    }

    /// The ranges of chunks in order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> {
        let Self {
            batch_size,
            chunk_size,
        } = *self;
        (0..batch_size)
            .step_by(chunk_size)
            .map(move |start| start..(start + chunk_size).min(batch_size))
    }

    /// Slicing the chunk at `range` from the leading dimension of `tensor`.
    pub fn slice<B: Backend, const D: usize>(
        &self,
        tensor: Tensor<B, D>,
        range: Range<usize>,
    ) -> Tensor<B, D> {
        debug_assert_eq!(tensor.dims()[0], self.batch_size);

        let mut ranges = tensor.dims().map(|dim| 0..dim);
        ranges[0] = range;
        tensor.slice(ranges)
    }

    /// Concatenating the chunk outputs along the leading dimension.
    pub fn join<B: Backend, const D: usize>(
        &self,
        chunks: Vec<Tensor<B, D>>,
    ) -> Tensor<B, D> {
        let output = Tensor::cat(chunks, 0);
        debug_assert_eq!(output.dims()[0], self.batch_size);
        output
    }

    /// Applying `f` on every chunk of `input` and joining the outputs in order.
    pub fn map<B: Backend, const D: usize, const D2: usize, F>(
        &self,
        input: Tensor<B, D>,
        mut f: F,
    ) -> Result<Tensor<B, D2>, Error>
    where
        F: FnMut(Tensor<B, D>, Range<usize>) -> Result<Tensor<B, D2>, Error>,
    {
        if self.chunk_count() <= 1 {
            return f(input, 0..self.batch_size);
        }

        let chunks = self
            .ranges()
            .map(|range| f(self.slice(input.to_owned(), range.to_owned()), range))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.join(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn ranges() {
        let context = ChunkContext::new(10, 4).unwrap();
        assert_eq!(context.chunk_count(), 3);
        assert_eq!(context.ranges().collect::<Vec<_>>(), vec![0..4, 4..8, 8..10]);

        let context = ChunkContext::new(0, 4).unwrap();
        assert_eq!(context.chunk_count(), 0);
        assert_eq!(context.ranges().count(), 0);
    }

    #[test]
    fn new_with_zero_chunk_size() {
        let error = ChunkContext::new(10, 0).unwrap_err();
        assert!(matches!(error, Error::Validation(..)));
    }

    #[test]
    fn map_preserves_order() {
        let device = &Default::default();

        let input = Tensor::<B, 1, burn::tensor::Int>::arange(0..7, device)
            .float()
            .reshape([7, 1]);
        let context = ChunkContext::new(7, 3).unwrap();
        let mut visited = Vec::new();
        let output = context
            .map(input.to_owned(), |chunk, range| {
                visited.push(range);
                Ok(chunk.mul_scalar(2.0))
            })
            .unwrap();

        assert_eq!(visited, vec![0..3, 3..6, 6..7]);
        output
            .into_data()
            .assert_eq(&input.mul_scalar(2.0).into_data(), true);
    }
}
