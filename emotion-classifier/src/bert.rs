use crate::InferenceBackend;
use candle_core::{Device, IndexOp, Module, Tensor, D};
use candle_nn::{Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use pulsemap_core::{ClassifierError, EmotionLabel};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Fields of a `BertForSequenceClassification` config.json that the bare encoder ignores.
#[derive(Debug, Deserialize)]
struct HeadConfig {
    hidden_size: usize,
    #[serde(default = "default_max_positions")]
    max_position_embeddings: usize,
    #[serde(default)]
    id2label: HashMap<String, String>,
}

fn default_max_positions() -> usize {
    512
}

/// BERT encoder plus pooler and classification head, run on the CPU with candle.
pub struct BertEmotionBackend {
    model: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
    max_positions: usize,
}

fn load_error(model_dir: &Path, reason: impl ToString) -> ClassifierError {
    ClassifierError::ModelLoadingFailed {
        model_path: model_dir.display().to_string(),
        reason: reason.to_string(),
    }
}

fn inference_error(error: candle_core::Error) -> ClassifierError {
    ClassifierError::InferenceFailed {
        reason: error.to_string(),
    }
}

impl BertEmotionBackend {
    pub fn load(model_dir: &Path) -> Result<Self, ClassifierError> {
        let raw_config = std::fs::read_to_string(model_dir.join(CONFIG_FILE))
            .map_err(|e| load_error(model_dir, e))?;
        let bert_config: Config =
            serde_json::from_str(&raw_config).map_err(|e| load_error(model_dir, e))?;
        let head: HeadConfig =
            serde_json::from_str(&raw_config).map_err(|e| load_error(model_dir, e))?;

        let num_labels = if head.id2label.is_empty() {
            EmotionLabel::ALL.len()
        } else {
            head.id2label.len()
        };
        if num_labels != EmotionLabel::ALL.len() {
            return Err(load_error(
                model_dir,
                format!(
                    "model has {} labels, expected {}",
                    num_labels,
                    EmotionLabel::ALL.len()
                ),
            ));
        }

        let tokenizer = Tokenizer::from_file(model_dir.join(TOKENIZER_FILE))
            .map_err(|e| load_error(model_dir, e))?;

        let device = Device::Cpu;
        let weights = model_dir.join(WEIGHTS_FILE);
        // SAFETY: the weights file is opened read-only and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DTYPE, &device) }
            .map_err(|e| load_error(model_dir, e))?;

        let model =
            BertModel::load(vb.pp("bert"), &bert_config).map_err(|e| load_error(model_dir, e))?;
        let pooler = candle_nn::linear(
            head.hidden_size,
            head.hidden_size,
            vb.pp("bert.pooler.dense"),
        )
        .map_err(|e| load_error(model_dir, e))?;
        let classifier = candle_nn::linear(head.hidden_size, num_labels, vb.pp("classifier"))
            .map_err(|e| load_error(model_dir, e))?;

        info!("Loaded emotion model from {}", model_dir.display());

        Ok(Self {
            model,
            pooler,
            classifier,
            tokenizer,
            device,
            max_positions: head.max_position_embeddings,
        })
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>, ClassifierError> {
        let encoding =
            self.tokenizer
                .encode(text, true)
                .map_err(|e| ClassifierError::TokenizationFailed {
                    text_length: text.chars().count(),
                    reason: e.to_string(),
                })?;
        Ok(encoding.get_ids().to_vec())
    }

    fn logits(&self, ids: &[u32]) -> candle_core::Result<Tensor> {
        let input_ids = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids)?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        self.classifier.forward(&pooled)
    }
}

impl InferenceBackend for BertEmotionBackend {
    fn token_count(&self, text: &str) -> Result<usize, ClassifierError> {
        Ok(self.encode(text)?.len())
    }

    fn predict_ordinal(&self, text: &str) -> Result<i64, ClassifierError> {
        let mut ids = self.encode(text)?;
        // position embeddings end here; anything longer cannot be embedded
        ids.truncate(self.max_positions);

        let logits = self.logits(&ids).map_err(inference_error)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1).map_err(inference_error)?;
        debug!("Emotion probabilities: {}", probs);

        let ordinal = logits
            .argmax(D::Minus1)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_scalar::<u32>())
            .map_err(inference_error)?;
        Ok(i64::from(ordinal))
    }
}
