//! ONNX token-classification model.
//!
//! A model directory holds `model.onnx`, `tokenizer.json` and a
//! `config.json` carrying the `id2label` map. Text is fed in windows of
//! whole lines that fit `max_sequence_length` tokens (an overlong line is
//! cut at token boundaries), and BIO tags are merged back into spans over
//! the original text.

use super::NlpModel;
use super::tokenizer::lines_with_offsets;
use crate::types::{EntityLabel, EntitySpan, NlpTier};
use crate::{CvError, Result};
use ort::inputs;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Value;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

pub struct TransformerModel {
    name: String,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    max_sequence_length: usize,
    with_token_type_ids: bool,
}

impl fmt::Debug for TransformerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerModel")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .field("max_sequence_length", &self.max_sequence_length)
            .finish()
    }
}

fn load_error(dir: &Path, what: &str, err: impl fmt::Display) -> CvError {
    CvError::nlp(format!("Failed to load {} from {}: {}", what, dir.display(), err))
}

fn inference_error(err: impl fmt::Display) -> CvError {
    CvError::nlp(format!("Inference failed: {}", err))
}

fn read_labels(config_path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(config_path)?;
    let config: serde_json::Value = serde_json::from_str(&raw)?;
    let id2label = config
        .get("id2label")
        .and_then(|v| v.as_object())
        .ok_or_else(|| CvError::nlp(format!("{} has no id2label map", config_path.display())))?;

    let mut labels = vec![String::from("O"); id2label.len()];
    for (id, label) in id2label {
        let index: usize = id
            .parse()
            .map_err(|_| CvError::nlp(format!("Invalid label id '{}' in {}", id, config_path.display())))?;
        let name = label.as_str().unwrap_or("O").to_string();
        if index >= labels.len() {
            labels.resize(index + 1, String::from("O"));
        }
        labels[index] = name;
    }
    Ok(labels)
}

impl TransformerModel {
    /// Load a model directory.
    ///
    /// # Errors
    ///
    /// Returns `CvError::Nlp` when any of the three files is missing or
    /// cannot be parsed, and `CvError::Io` when the label config can't be read.
    pub fn load(dir: impl AsRef<Path>, max_sequence_length: usize) -> Result<Self> {
        let dir = dir.as_ref();
        let model_path: PathBuf = dir.join("model.onnx");
        let tokenizer_path = dir.join("tokenizer.json");
        let config_path = dir.join("config.json");

        for path in [&model_path, &tokenizer_path, &config_path] {
            if !path.exists() {
                return Err(CvError::nlp(format!("Model file not found: {}", path.display())));
            }
        }

        let labels = read_labels(&config_path)?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| load_error(dir, "tokenizer", e))?;

        let session = Session::builder()
            .map_err(|e| load_error(dir, "session", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(dir, "session", e))?
            .with_intra_threads(num_cpus::get().clamp(1, 4))
            .map_err(|e| load_error(dir, "session", e))?
            .commit_from_file(&model_path)
            .map_err(|e| load_error(dir, "model", e))?;
        let with_token_type_ids = session.inputs.len() >= 3;

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "transformer".to_string());

        tracing::info!(model = %name, labels = labels.len(), "Loaded transformer NER model");

        Ok(Self {
            name,
            session: Mutex::new(session),
            tokenizer,
            labels,
            max_sequence_length: max_sequence_length.max(8),
            with_token_type_ids,
        })
    }

    /// Token byte offsets of `text`, without special tokens.
    fn token_offsets(&self, text: &str) -> Result<Vec<(usize, usize)>> {
        self.tokenizer
            .encode(text, false)
            .map(|e| e.get_offsets().to_vec())
            .map_err(|e| CvError::nlp(format!("Tokenization failed: {}", e)))
    }

    /// Group lines into windows of at most `max_sequence_length - 2` tokens.
    /// A line longer than that is cut at token boundaries.
    fn windows<'a>(&self, text: &'a str) -> Result<Vec<(usize, &'a str)>> {
        let budget = self.max_sequence_length.saturating_sub(2);
        let mut ranges = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        let mut used = 0;

        for (offset, line) in lines_with_offsets(text) {
            if line.trim().is_empty() {
                continue;
            }
            let offsets = self.token_offsets(line)?;
            let count = offsets.len();
            if count > budget {
                ranges.extend(current.take());
                used = 0;
                ranges.extend(split_offsets(&offsets, budget).into_iter().map(|(s, e)| (offset + s, offset + e)));
                continue;
            }
            if used + count > budget {
                ranges.extend(current.take());
                used = 0;
            }
            let start = current.map_or(offset, |(s, _)| s);
            current = Some((start, offset + line.len()));
            used += count;
        }
        ranges.extend(current);

        Ok(ranges.into_iter().map(|(s, e)| (s, &text[s..e])).collect())
    }

    fn label_window(&self, base: usize, window: &str, text: &str, out: &mut Vec<EntitySpan>) -> Result<()> {
        let encoding = self
            .tokenizer
            .encode(window, true)
            .map_err(|e| CvError::nlp(format!("Tokenization failed: {}", e)))?;

        let limit = encoding.get_ids().len().min(self.max_sequence_length);
        let ids: Vec<i64> = encoding.get_ids()[..limit].iter().map(|&v| i64::from(v)).collect();
        let mask: Vec<i64> = encoding.get_attention_mask()[..limit].iter().map(|&v| i64::from(v)).collect();
        let type_ids: Vec<i64> = encoding.get_type_ids()[..limit].iter().map(|&v| i64::from(v)).collect();
        let offsets = &encoding.get_offsets()[..limit];
        let seq_len = ids.len();

        let ids_tensor = Value::from_array(([1usize, seq_len], ids.into_boxed_slice())).map_err(inference_error)?;
        let mask_tensor = Value::from_array(([1usize, seq_len], mask.into_boxed_slice())).map_err(inference_error)?;

        let mut session = self.session.lock();
        let run = if self.with_token_type_ids {
            let type_tensor =
                Value::from_array(([1usize, seq_len], type_ids.into_boxed_slice())).map_err(inference_error)?;
            session.run(inputs![ids_tensor, mask_tensor, type_tensor])
        } else {
            session.run(inputs![ids_tensor, mask_tensor])
        };
        let outputs = run.map_err(inference_error)?;

        let (shape, logits) = outputs[0].try_extract_tensor::<f32>().map_err(inference_error)?;
        let num_labels = shape.last().copied().unwrap_or(0).max(0) as usize;
        if num_labels == 0 || logits.len() < seq_len * num_labels {
            return Err(CvError::nlp(format!("Unexpected logits shape {:?}", shape)));
        }

        let mut current: Option<(EntityLabel, usize, usize, f32, usize)> = None;
        for (i, &(tok_start, tok_end)) in offsets.iter().enumerate() {
            if tok_start >= tok_end {
                continue;
            }
            let (best, score) = argmax_softmax(&logits[i * num_labels..(i + 1) * num_labels]);
            let tag = self.labels.get(best).map(String::as_str).unwrap_or("O");
            let label = EntityLabel::from_model_label(tag);
            let begins = tag.starts_with("B-") || tag.starts_with("S-");
            let start = base + tok_start;
            let end = base + tok_end;

            let continues = !begins && matches!((label, &current), (Some(l), Some((cl, ..))) if l == *cl);
            if continues {
                if let Some((_, _, cend, total, count)) = current.as_mut() {
                    *cend = end;
                    *total += score;
                    *count += 1;
                }
            } else {
                flush(current.take(), text, out);
                current = label.map(|l| (l, start, end, score, 1));
            }
        }
        flush(current, text, out);
        Ok(())
    }
}

fn flush(current: Option<(EntityLabel, usize, usize, f32, usize)>, text: &str, out: &mut Vec<EntitySpan>) {
    let Some((label, start, end, total, count)) = current else {
        return;
    };
    if !text.is_char_boundary(start) || !text.is_char_boundary(end) || start >= end {
        return;
    }
    out.push(EntitySpan {
        label,
        start,
        end,
        text: text[start..end].to_string(),
        score: total / count as f32,
    });
}

/// Byte ranges covering consecutive runs of at most `budget` tokens.
fn split_offsets(offsets: &[(usize, usize)], budget: usize) -> Vec<(usize, usize)> {
    offsets
        .chunks(budget.max(1))
        .filter_map(|run| Some((run.first()?.0, run.last()?.1)))
        .collect()
}

fn argmax_softmax(row: &[f32]) -> (usize, f32) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let sum: f32 = row.iter().map(|v| (v - max).exp()).sum();
    let (best, value) = row
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |acc, (i, v)| if v > acc.1 { (i, v) } else { acc });
    (best, (value - max).exp() / sum)
}

impl NlpModel for TransformerModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> NlpTier {
        NlpTier::Transformer
    }

    fn entities(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let mut entities = Vec::new();
        for (base, window) in self.windows(text)? {
            self.label_window(base, window, text, &mut entities)?;
        }
        Ok(entities)
    }
}
