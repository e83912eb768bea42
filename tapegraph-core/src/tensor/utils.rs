use crate::error::TapeGraphError;
use std::cmp::max;

/// Calculates the contiguous (row-major) strides for a given shape.
///
/// Example:
/// shape = [2, 3] -> strides = [3, 1]
/// shape = [2, 2, 2] -> strides = [4, 2, 1]
pub fn calculate_strides(shape: &[usize]) -> Vec<usize> {
    if shape.is_empty() {
        return vec![];
    }
    let rank = shape.len();
    let mut strides = vec![1; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Determines the output shape resulting from broadcasting two input shapes.
///
/// Shapes are aligned from the trailing dimension. Each pair of dimensions
/// must be equal or one of them must be 1; the result takes the larger.
/// Missing leading dimensions count as 1.
pub fn broadcast_shapes(shape_a: &[usize], shape_b: &[usize]) -> Result<Vec<usize>, TapeGraphError> {
    let rank_a = shape_a.len();
    let rank_b = shape_b.len();
    let max_rank = max(rank_a, rank_b);
    let mut result_shape = vec![0; max_rank];

    for i in 0..max_rank {
        let dim_a = if i < rank_a { shape_a[rank_a - 1 - i] } else { 1 };
        let dim_b = if i < rank_b { shape_b[rank_b - 1 - i] } else { 1 };

        result_shape[max_rank - 1 - i] = if dim_a == dim_b || dim_b == 1 {
            dim_a
        } else if dim_a == 1 {
            dim_b
        } else {
            return Err(TapeGraphError::shape("broadcast", &[shape_a, shape_b]));
        };
    }
    Ok(result_shape)
}

/// Converts a flat row-major index into coordinates.
pub fn index_to_coord(index: usize, strides: &[usize], shape: &[usize]) -> Vec<usize> {
    let mut coord = vec![0; shape.len()];
    let mut current_index = index;
    for (i, &stride) in strides.iter().enumerate() {
        if stride == 0 {
            continue;
        }
        coord[i] = current_index / stride;
        current_index %= stride;
    }
    coord
}

/// Maps coordinates in a broadcast result back to a flat index into an
/// operand of `source_shape`. Size-1 and missing leading dimensions of the
/// operand always read index 0.
pub fn broadcast_source_index(target_coord: &[usize], source_shape: &[usize], source_strides: &[usize]) -> usize {
    let rank_diff = target_coord.len().saturating_sub(source_shape.len());
    source_shape
        .iter()
        .zip(source_strides)
        .enumerate()
        .map(|(i, (&dim, &stride))| {
            let coord = if dim == 1 { 0 } else { target_coord[rank_diff + i] };
            coord * stride
        })
        .sum()
}

#[cfg(test)]
#[path = "utils_test.rs"]
mod tests;
