//! Logits tensor loading and shape handling.

use crate::error::{Result, TensorError};
use ndarray::{Array3, ArrayD, ArrayView2, ArrayView3, Axis, Ix3};
use ndarray_npy::{ReadNpyError, read_npy};
use ndarray_stats::QuantileExt;
use ndarray_stats::errors::MinMaxError;
use std::path::Path;

/// Logits laid out as `[batch, frames, vocab]`.
pub type Logits = Array3<f32>;

/// Load a float32 or float64 `.npy` logits tensor.
///
/// Accepts `[batch, frames, vocab]` or `[frames, vocab]`; the latter gets a
/// batch axis of 1. Float64 data is narrowed to f32.
pub fn load_logits(path: impl AsRef<Path>) -> Result<Logits> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TensorError::NotFound(path.to_path_buf()).into());
    }

    let read_error = |source: ReadNpyError| TensorError::Read {
        path: path.to_path_buf(),
        source,
    };

    let array = match read_npy::<_, ArrayD<f32>>(path) {
        Ok(array) => array,
        Err(ReadNpyError::WrongDescriptor(descr)) => {
            tracing::debug!(path = ?path.display(), descr = ?descr, "not float32, reading as float64");
            let wide: ArrayD<f64> = read_npy(path).map_err(read_error)?;
            wide.mapv(|x| x as f32)
        }
        Err(source) => return Err(read_error(source).into()),
    };

    tracing::debug!(path = ?path.display(), shape = ?array.shape(), "loaded logits");

    to_batched(array)
}

/// Bring a dynamic-rank array into `[batch, frames, vocab]` layout.
pub fn to_batched(array: ArrayD<f32>) -> Result<Logits> {
    let array = match array.ndim() {
        2 => array.insert_axis(Axis(0)),
        3 => array,
        _ => {
            return Err(TensorError::InvalidShape {
                shape: array.shape().to_vec(),
                expected: "[batch, frames, vocab] or [frames, vocab]",
            }
            .into());
        }
    };

    Ok(array.into_dimensionality::<Ix3>()?)
}

/// Drop a leading batch axis of size 1.
pub fn squeeze_batch(logits: ArrayView3<'_, f32>) -> Result<ArrayView2<'_, f32>> {
    if logits.len_of(Axis(0)) != 1 {
        return Err(TensorError::InvalidShape {
            shape: logits.shape().to_vec(),
            expected: "a batch axis of size 1",
        }
        .into());
    }

    Ok(logits.index_axis_move(Axis(0), 0))
}

/// Highest-scoring vocabulary id per frame.
///
/// Ties resolve to the lowest id. A frame holding NaN fails with
/// [`TensorError::UnorderedScores`].
pub fn argmax_frames(logits: ArrayView2<'_, f32>) -> Result<Vec<usize>> {
    logits
        .outer_iter()
        .enumerate()
        .map(|(frame, scores)| match scores.argmax() {
            Ok(id) => Ok(id),
            Err(MinMaxError::UndefinedOrder) => Err(TensorError::UnorderedScores { frame }.into()),
            Err(e) => Err(e.into()),
        })
        .collect()
}

/// Highest-scoring vocabulary id per `(batch, frame)` position, row-major.
///
/// Positions whose scores contain NaN yield `None`.
pub fn argmax_tokens(logits: ArrayView3<'_, f32>) -> Result<Vec<Option<usize>>> {
    let (batch, frames, _) = logits.dim();
    let mut ids = Vec::with_capacity(batch * frames);

    for item in logits.outer_iter() {
        for scores in item.outer_iter() {
            match scores.argmax() {
                Ok(id) => ids.push(Some(id)),
                Err(MinMaxError::UndefinedOrder) => ids.push(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::{IxDyn, array};
    use ndarray_npy::write_npy;

    #[test]
    fn adds_batch_axis_to_matrix() {
        let array = ArrayD::<f32>::zeros(IxDyn(&[4, 7]));
        let logits = to_batched(array).unwrap();
        assert_eq!(logits.dim(), (1, 4, 7));
    }

    #[test]
    fn rejects_vector() {
        let array = ArrayD::<f32>::zeros(IxDyn(&[4]));
        assert!(matches!(
            to_batched(array),
            Err(Error::Tensor(TensorError::InvalidShape { .. }))
        ));
    }

    #[test]
    fn squeezes_single_batch() {
        let logits = Array3::<f32>::zeros((1, 3, 5));
        let frames = squeeze_batch(logits.view()).unwrap();
        assert_eq!(frames.dim(), (3, 5));
    }

    #[test]
    fn refuses_to_squeeze_multi_batch() {
        let logits = Array3::<f32>::zeros((2, 3, 5));
        assert!(squeeze_batch(logits.view()).is_err());
    }

    #[test]
    fn argmax_prefers_first_of_ties() {
        let logits = array![[0.1f32, 0.9, 0.9], [2.0, 1.0, 0.0], [-1.0, -3.0, -0.5]];
        assert_eq!(argmax_frames(logits.view()).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn argmax_names_frame_with_nan() {
        let logits = array![[0.1f32, 0.9], [f32::NAN, 1.0], [2.0, 1.0]];

        assert!(matches!(
            argmax_frames(logits.view()),
            Err(Error::Tensor(TensorError::UnorderedScores { frame: 1 }))
        ));
    }

    #[test]
    fn argmax_tokens_skips_nan_positions() {
        let mut logits = Array3::<f32>::zeros((1, 3, 2));
        logits[[0, 0, 1]] = 1.0;
        logits[[0, 1, 0]] = f32::NAN;

        assert_eq!(argmax_tokens(logits.view()).unwrap(), vec![Some(1), None, Some(0)]);
    }

    #[test]
    fn argmax_rejects_empty_vocabulary() {
        let logits = Array3::<f32>::zeros((1, 2, 0));
        assert!(matches!(
            argmax_tokens(logits.view()),
            Err(Error::Tensor(TensorError::MinMax(_)))
        ));
    }

    #[test]
    fn loads_npy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logits.npy");
        write_npy(&path, &Array3::<f32>::ones((1, 2, 3))).unwrap();

        let logits = load_logits(&path).unwrap();

        assert_eq!(logits.dim(), (1, 2, 3));
    }

    #[test]
    fn loads_float64_npy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logits.npy");
        write_npy(&path, &array![[0.25f64, -1.5], [3.0, 0.0]]).unwrap();

        let logits = load_logits(&path).unwrap();

        assert_eq!(logits.dim(), (1, 2, 2));
        assert_eq!(logits[[0, 0, 1]], -1.5);
    }

    #[test]
    fn names_supported_dtypes_on_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.npy");
        write_npy(&path, &array![[1i32, 2], [3, 4]]).unwrap();

        let err = load_logits(&path).unwrap_err();

        assert!(matches!(err, Error::Tensor(TensorError::Read { .. })));
        assert!(err.to_string().contains("float32 or float64"));
    }

    #[test]
    fn reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_logits(dir.path().join("missing.npy")),
            Err(Error::Tensor(TensorError::NotFound(_)))
        ));
    }
}
