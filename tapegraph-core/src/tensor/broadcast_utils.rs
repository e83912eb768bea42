use crate::error::TapeGraphError;
use crate::tensor::utils::broadcast_shapes;
use crate::tensor::Tensor;

impl Tensor {
    /// Reduces the tensor (gradient) to match a target shape by summing along broadcasted dimensions.
    ///
    /// This is the backward counterpart of broadcasting: when an operand of
    /// shape `target_shape` was broadcast up to `self.shape()`, the gradient
    /// for that operand is the sum over every broadcast copy. Leading
    /// dimensions missing from `target_shape` and size-1 dimensions of
    /// `target_shape` are summed out; the result always has `target_shape`.
    ///
    /// # Errors
    /// `TapeGraphError::Shape` if `target_shape` does not broadcast to the
    /// current shape.
    pub fn reduce_to_shape(&self, target_shape: &[usize]) -> Result<Tensor, TapeGraphError> {
        if self.shape == target_shape {
            return Ok(self.clone());
        }
        let broadcast = broadcast_shapes(target_shape, &self.shape)
            .map_err(|_| TapeGraphError::shape("reduce_to_shape", &[&self.shape, target_shape]))?;
        if broadcast != self.shape {
            return Err(TapeGraphError::shape("reduce_to_shape", &[&self.shape, target_shape]));
        }
        Ok(self.sum_to_shape_unchecked(target_shape))
    }

    /// Expands the tensor to `target_shape` by repeating size-1 and missing
    /// leading dimensions.
    ///
    /// Used in backward passes of reductions, where a scalar gradient must
    /// be spread back over every contributing element.
    pub fn expand_to(&self, target_shape: &[usize]) -> Result<Tensor, TapeGraphError> {
        if self.shape == target_shape {
            return Ok(self.clone());
        }
        let broadcast = broadcast_shapes(&self.shape, target_shape)
            .map_err(|_| TapeGraphError::shape("expand_to", &[&self.shape, target_shape]))?;
        if broadcast != target_shape {
            return Err(TapeGraphError::shape("expand_to", &[&self.shape, target_shape]));
        }
        Ok(self.expand_to_shape_unchecked(target_shape))
    }
}
