// src/tensor/debug.rs
use crate::tensor::Tensor;
use std::fmt;

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor(shape={:?}, dtype={:?}, data={:?})",
            self.shape,
            self.dtype(),
            self.to_vec_f64()
        )
    }
}

/// Scalars print as a bare number, vectors as `[a  b  c]`, higher ranks
/// as nested rows.
impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.to_vec_f64();
        if self.shape.is_empty() {
            return write!(f, "{}", data[0]);
        }
        write_nested(f, &data, &self.shape)
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, data: &[f64], shape: &[usize]) -> fmt::Result {
    if shape.len() == 1 {
        write!(f, "[")?;
        for (i, v) in data.iter().enumerate() {
            if i > 0 {
                write!(f, "  ")?;
            }
            write!(f, "{}", v)?;
        }
        return write!(f, "]");
    }
    let chunk = shape[1..].iter().product::<usize>().max(1);
    write!(f, "[")?;
    for (i, row) in data.chunks(chunk).enumerate() {
        if i > 0 {
            writeln!(f)?;
            write!(f, " ")?;
        }
        write_nested(f, row, &shape[1..])?;
    }
    write!(f, "]")
}
