use crate::error::TapeGraphError;
use crate::tensor::Tensor;

impl Tensor {
    /// Returns a tensor with the same data and a new shape.
    ///
    /// Tensors are always contiguous, so this never copies: the result
    /// shares the buffer with `self`.
    ///
    /// # Errors
    /// `TapeGraphError::Shape` if the element counts differ.
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Tensor, TapeGraphError> {
        let new_numel: usize = new_shape.iter().product();
        if new_numel != self.numel() {
            return Err(TapeGraphError::shape("reshape", &[&self.shape, new_shape]));
        }
        Ok(Tensor {
            buffer: self.buffer.clone(),
            shape: new_shape.to_vec(),
        })
    }
}
