//! Reference vs. converted logits comparison.

use crate::error::{Result, TensorError};
use crate::tensor::{argmax_tokens, load_logits};
use crate::types::Warning;
use ndarray::{ArrayView3, Zip, s};
use std::path::Path;

/// Minimum token agreement for a conversion to be accepted.
///
/// This is an acceptance criterion, not a tuning knob.
pub const PASS_THRESHOLD_PCT: f64 = 99.9;

/// Whether a token accuracy percentage meets [`PASS_THRESHOLD_PCT`].
pub fn passes(token_accuracy_pct: f64) -> bool {
    token_accuracy_pct >= PASS_THRESHOLD_PCT
}

/// Divergence statistics between two logits tensors.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationResult {
    pub max_abs_diff: f64,
    pub mean_abs_diff: f64,
    pub token_match_count: usize,
    pub token_total: usize,
    pub token_accuracy_pct: f64,
    pub passed: bool,
}

/// Comparison outcome with any non-fatal warnings raised while aligning.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub result: ValidationResult,
    pub warnings: Vec<Warning>,
}

/// Compare reference and converted logits.
///
/// When frame counts differ both tensors are truncated to the shorter one and
/// a [`Warning::ShapeMismatch`] is recorded. Batch and vocabulary axes must agree.
pub fn compare(reference: ArrayView3<'_, f32>, converted: ArrayView3<'_, f32>) -> Result<Comparison> {
    let (ref_batch, ref_frames, ref_vocab) = reference.dim();
    let (conv_batch, conv_frames, conv_vocab) = converted.dim();

    if ref_batch != conv_batch || ref_vocab != conv_vocab {
        return Err(TensorError::IncompatibleShape {
            reference: reference.shape().to_vec(),
            converted: converted.shape().to_vec(),
        }
        .into());
    }

    let mut warnings = Vec::new();
    let frames = ref_frames.min(conv_frames);

    if ref_frames != conv_frames {
        tracing::warn!(
            reference = ref_frames,
            converted = conv_frames,
            compared = frames,
            "frame count mismatch, truncating"
        );
        warnings.push(Warning::ShapeMismatch {
            reference_frames: ref_frames,
            converted_frames: conv_frames,
            compared: frames,
        });
    }

    let reference = reference.slice_move(s![.., ..frames, ..]);
    let converted = converted.slice_move(s![.., ..frames, ..]);

    if reference.is_empty() {
        return Err(TensorError::Empty(reference.shape().to_vec()).into());
    }

    // NaN propagates into both statistics.
    let (max_abs_diff, sum_abs_diff) = Zip::from(&reference).and(&converted).fold(
        (0.0f64, 0.0f64),
        |(max, sum), &r, &c| {
            let diff = f64::from((r - c).abs());
            let max = if max.is_nan() || diff.is_nan() { f64::NAN } else { max.max(diff) };
            (max, sum + diff)
        },
    );
    let mean_abs_diff = sum_abs_diff / reference.len() as f64;

    let reference_tokens = argmax_tokens(reference)?;
    let converted_tokens = argmax_tokens(converted)?;

    let unordered = reference_tokens
        .iter()
        .zip(&converted_tokens)
        .filter(|(r, c)| r.is_none() || c.is_none())
        .count();

    if unordered > 0 {
        tracing::warn!(positions = unordered, "NaN scores, counting as mismatches");
        warnings.push(Warning::UnorderedScores { positions: unordered });
    }

    let token_total = reference_tokens.len();
    let token_match_count = reference_tokens
        .iter()
        .zip(&converted_tokens)
        .filter(|(r, c)| r.is_some() && r == c)
        .count();
    let token_accuracy_pct = (token_match_count * 100) as f64 / token_total as f64;

    let result = ValidationResult {
        max_abs_diff,
        mean_abs_diff,
        token_match_count,
        token_total,
        token_accuracy_pct,
        passed: passes(token_accuracy_pct),
    };

    tracing::info!(
        max_abs_diff,
        mean_abs_diff,
        matched = token_match_count,
        total = token_total,
        accuracy = token_accuracy_pct,
        passed = result.passed,
        "compared logits"
    );

    Ok(Comparison { result, warnings })
}

/// Load two `.npy` logits files and compare them.
pub fn compare_files(reference: impl AsRef<Path>, converted: impl AsRef<Path>) -> Result<Comparison> {
    let reference = load_logits(reference)?;
    let converted = load_logits(converted)?;

    tracing::info!(
        reference = ?reference.shape(),
        converted = ?converted.shape(),
        "comparing logits"
    );

    compare(reference.view(), converted.view())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::Array3;

    /// Logits whose argmax at frame `t` is `ids[t]`.
    fn one_hot(ids: &[usize], vocab: usize) -> Array3<f32> {
        let mut logits = Array3::zeros((1, ids.len(), vocab));
        for (t, &id) in ids.iter().enumerate() {
            logits[[0, t, id]] = 1.0;
        }
        logits
    }

    #[test]
    fn identical_tensors_pass() {
        let logits = Array3::from_shape_fn((1, 10, 25055), |(_, t, v)| ((t * 31 + v) % 97) as f32);

        let comparison = compare(logits.view(), logits.view()).unwrap();
        let result = comparison.result;

        assert_eq!(result.max_abs_diff, 0.0);
        assert_eq!(result.mean_abs_diff, 0.0);
        assert_eq!(result.token_match_count, 10);
        assert_eq!(result.token_total, 10);
        assert_eq!(result.token_accuracy_pct, 100.0);
        assert!(result.passed);
        assert!(comparison.warnings.is_empty());
    }

    #[test]
    fn truncates_to_common_frames() {
        let reference = one_hot(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 9], 12);
        let converted = one_hot(&[1, 2, 3, 4, 5, 6, 7, 8], 12);

        let comparison = compare(reference.view(), converted.view()).unwrap();

        assert_eq!(comparison.result.token_total, 8);
        assert_eq!(comparison.result.token_accuracy_pct, 100.0);
        assert_eq!(
            comparison.warnings,
            vec![Warning::ShapeMismatch {
                reference_frames: 10,
                converted_frames: 8,
                compared: 8,
            }]
        );
    }

    #[test]
    fn computes_difference_statistics() {
        let reference = Array3::<f32>::zeros((1, 2, 2));
        let mut converted = Array3::<f32>::zeros((1, 2, 2));
        converted[[0, 0, 0]] = 0.5;
        converted[[0, 1, 1]] = -1.5;

        let result = compare(reference.view(), converted.view()).unwrap().result;

        assert_eq!(result.max_abs_diff, 1.5);
        assert_eq!(result.mean_abs_diff, 0.5);
    }

    #[test]
    fn counts_disagreeing_frames() {
        let reference = one_hot(&[1, 1, 2, 2], 4);
        let converted = one_hot(&[1, 3, 2, 0], 4);

        let result = compare(reference.view(), converted.view()).unwrap().result;

        assert_eq!(result.token_match_count, 2);
        assert_eq!(result.token_accuracy_pct, 50.0);
        assert!(!result.passed);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(passes(99.9));
        assert!(!passes(99.89));
        assert!(passes(100.0));
    }

    #[test]
    fn one_miss_in_a_thousand_passes() {
        let ids: Vec<usize> = (0..1000).map(|i| i % 5).collect();
        let mut flipped = ids.clone();
        flipped[500] = 4 - flipped[500] % 4;

        let reference = one_hot(&ids, 5);
        let converted = one_hot(&flipped, 5);

        let result = compare(reference.view(), converted.view()).unwrap().result;

        assert_eq!(result.token_match_count, 999);
        assert_eq!(result.token_accuracy_pct, 99.9);
        assert!(result.passed);
    }

    #[test]
    fn nan_frame_counts_as_mismatch() {
        let reference = one_hot(&[1, 2, 3, 0], 4);
        let mut converted = reference.clone();
        converted[[0, 2, 3]] = f32::NAN;

        let comparison = compare(reference.view(), converted.view()).unwrap();
        let result = comparison.result;

        assert_eq!(result.token_match_count, 3);
        assert_eq!(result.token_total, 4);
        assert!(!result.passed);
        assert!(result.max_abs_diff.is_nan());
        assert!(result.mean_abs_diff.is_nan());
        assert_eq!(comparison.warnings, vec![Warning::UnorderedScores { positions: 1 }]);
    }

    #[test]
    fn rejects_vocabulary_mismatch() {
        let reference = Array3::<f32>::zeros((1, 4, 10));
        let converted = Array3::<f32>::zeros((1, 4, 11));

        assert!(matches!(
            compare(reference.view(), converted.view()),
            Err(Error::Tensor(TensorError::IncompatibleShape { .. }))
        ));
    }

    #[test]
    fn rejects_empty_overlap() {
        let reference = Array3::<f32>::zeros((1, 0, 10));
        let converted = Array3::<f32>::zeros((1, 4, 10));

        assert!(matches!(
            compare(reference.view(), converted.view()),
            Err(Error::Tensor(TensorError::Empty(_)))
        ));
    }
}
