//! Greedy CTC decoding of logits into text.

use crate::error::{DecodeError, Result};
use crate::tensor::{argmax_frames, load_logits, squeeze_batch};
use crate::vocab::Vocabulary;
use ndarray::{ArrayView2, ArrayView3};
use std::path::Path;

/// Reserved CTC blank id.
pub const BLANK_ID: usize = 0;

/// SentencePiece word-boundary marker.
pub const WORD_BOUNDARY: char = '▁';

/// Decoded transcription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    /// Emitted token ids after CTC collapse
    pub token_ids: Vec<usize>,
    /// Concatenated token strings, markup included
    pub raw_text: String,
    /// Final text with markup stripped and word boundaries as spaces
    pub text: String,
}

/// Collapse a per-frame id sequence by CTC rules.
///
/// A blank emits nothing and resets the repeat cursor, so two equal ids are
/// both emitted only when a blank separates them.
pub fn collapse(frame_ids: &[usize], blank_id: usize) -> Vec<usize> {
    let mut emitted = Vec::new();
    let mut prev = None;

    for &id in frame_ids {
        if id == blank_id {
            prev = None;
        } else if prev != Some(id) {
            emitted.push(id);
            prev = Some(id);
        }
    }

    emitted
}

/// Strip leading `<|...|>` tags, turn word boundaries into spaces and trim.
pub fn strip_markup(raw_text: &str) -> String {
    let mut text = raw_text;

    while text.starts_with("<|") {
        match text.find("|>") {
            Some(end) => text = &text[end + 2..],
            None => break,
        }
    }

    text.replace(WORD_BOUNDARY, " ").trim().to_string()
}

/// Greedy CTC decoder over a token vocabulary.
#[derive(Clone, Debug)]
pub struct CtcDecoder {
    vocabulary: Vocabulary,
    blank_id: usize,
}

impl CtcDecoder {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary,
            blank_id: BLANK_ID,
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Decode `[1, frames, vocab]` logits.
    pub fn decode(&self, logits: ArrayView3<'_, f32>) -> Result<Transcript> {
        self.decode_frames(squeeze_batch(logits)?)
    }

    /// Decode `[frames, vocab]` logits.
    pub fn decode_frames(&self, logits: ArrayView2<'_, f32>) -> Result<Transcript> {
        let frame_ids = argmax_frames(logits)?;
        Ok(self.decode_ids(&frame_ids))
    }

    /// Decode a per-frame id sequence.
    pub fn decode_ids(&self, frame_ids: &[usize]) -> Transcript {
        let token_ids = collapse(frame_ids, self.blank_id);

        let raw_text: String = token_ids
            .iter()
            .map(|&id| self.vocabulary.render(id))
            .collect();

        let text = strip_markup(&raw_text);

        tracing::debug!(tokens = token_ids.len(), raw_text = %raw_text, "decoded tokens");

        Transcript {
            token_ids,
            raw_text,
            text,
        }
    }
}

/// Decode a `.npy` logits file and write the final text to `output`.
///
/// Fails with [`DecodeError`] when either input file is missing; the
/// output's parent directories are created as needed.
pub fn decode_file(
    logits_path: impl AsRef<Path>,
    vocab_path: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<Transcript> {
    let (logits_path, vocab_path, output) = (logits_path.as_ref(), vocab_path.as_ref(), output.as_ref());

    if !logits_path.exists() {
        tracing::error!(path = ?logits_path.display(), "logits file not found");
        return Err(DecodeError::MissingLogits(logits_path.to_path_buf()).into());
    }

    if !vocab_path.exists() {
        tracing::error!(path = ?vocab_path.display(), "vocabulary file not found");
        return Err(DecodeError::MissingVocabulary(vocab_path.to_path_buf()).into());
    }

    let logits = load_logits(logits_path)?;
    let decoder = CtcDecoder::new(Vocabulary::from_file(vocab_path).map_err(DecodeError::from)?);

    tracing::info!(
        shape = ?logits.shape(),
        vocab_size = decoder.vocabulary().len(),
        "decoding logits"
    );

    let transcript = decoder.decode(logits.view())?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(DecodeError::from)?;
    }
    std::fs::write(output, &transcript.text).map_err(DecodeError::from)?;

    tracing::info!(path = ?output.display(), "wrote transcript");

    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::Array3;
    use ndarray_npy::write_npy;

    fn one_hot(ids: &[usize], vocab: usize) -> Array3<f32> {
        let mut logits = Array3::from_elem((1, ids.len(), vocab), -1.0);
        for (t, &id) in ids.iter().enumerate() {
            logits[[0, t, id]] = 5.0;
        }
        logits
    }

    #[test]
    fn collapses_repeats_between_blanks() {
        assert_eq!(collapse(&[0, 5, 5, 0, 5, 3, 3, 0], BLANK_ID), vec![5, 5, 3]);
    }

    #[test]
    fn collapses_all_blank_sequence() {
        assert!(collapse(&[0, 0, 0], BLANK_ID).is_empty());
        assert!(collapse(&[], BLANK_ID).is_empty());
    }

    #[test]
    fn strips_leading_tags() {
        assert_eq!(strip_markup("<|en|><|withitn|>hello▁world"), "hello world");
    }

    #[test]
    fn keeps_unterminated_tag() {
        assert_eq!(strip_markup("<|en|><|broken▁text"), "<|broken text");
    }

    #[test]
    fn keeps_inner_tags() {
        assert_eq!(strip_markup("<|en|>▁hi<|x|>"), "hi<|x|>");
    }

    #[test]
    fn decodes_logits_to_text() {
        let vocab = Vocabulary::parse("<blank> 0\n<|en|> 1\n▁hello 2\n▁world 3\n");
        let decoder = CtcDecoder::new(vocab);
        assert_eq!(decoder.vocabulary().len(), 4);
        let logits = one_hot(&[1, 1, 0, 2, 2, 0, 3, 0], 4);

        let transcript = decoder.decode(logits.view()).unwrap();

        assert_eq!(transcript.token_ids, vec![1, 2, 3]);
        assert_eq!(transcript.raw_text, "<|en|>▁hello▁world");
        assert_eq!(transcript.text, "hello world");
    }

    #[test]
    fn renders_unknown_ids() {
        let decoder = CtcDecoder::new(Vocabulary::parse("<blank> 0\n▁a 1"));
        let transcript = decoder.decode_ids(&[1, 9]);
        assert_eq!(transcript.text, "a<UNK_9>");
    }

    #[test]
    fn rejects_multi_batch_logits() {
        let decoder = CtcDecoder::new(Vocabulary::default());
        let logits = Array3::<f32>::zeros((2, 3, 4));
        assert!(decoder.decode(logits.view()).is_err());
    }

    #[test]
    fn decode_file_writes_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let logits_path = dir.path().join("logits.npy");
        let vocab_path = dir.path().join("tokens.txt");
        let output = dir.path().join("out/transcription.txt");

        write_npy(&logits_path, &one_hot(&[0, 1, 1, 2], 3)).unwrap();
        std::fs::write(&vocab_path, "<blank> 0\n<|zh|> 1\n▁ok 2\n").unwrap();

        let transcript = decode_file(&logits_path, &vocab_path, &output).unwrap();

        assert_eq!(transcript.text, "ok");
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "ok");
    }

    #[test]
    fn decode_file_reports_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let logits_path = dir.path().join("logits.npy");
        let vocab_path = dir.path().join("tokens.txt");
        let output = dir.path().join("transcription.txt");

        assert!(matches!(
            decode_file(&logits_path, &vocab_path, &output),
            Err(Error::Decode(DecodeError::MissingLogits(_)))
        ));

        write_npy(&logits_path, &one_hot(&[1], 2)).unwrap();

        assert!(matches!(
            decode_file(&logits_path, &vocab_path, &output),
            Err(Error::Decode(DecodeError::MissingVocabulary(_)))
        ));
        assert!(!output.exists());
    }
}
