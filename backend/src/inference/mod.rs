pub mod model;
pub mod postprocess;
pub mod preprocess;

use std::sync::Arc;

pub use model::{Classifier, load_classifier};
pub use postprocess::Prediction;
pub use preprocess::Preprocessor;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Model not loaded. Please try again later.")]
    ModelNotLoaded,
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    #[error("Model error: {0}")]
    Model(String),
    #[error("Unexpected model output: {0}")]
    Output(String),
    #[error("Model predicted index {0}, which has no class label")]
    UnknownClass(usize),
    #[error("Model lock poisoned")]
    #[cfg_attr(not(feature = "torch"), allow(dead_code))]
    Poisoned,
}

/// The process-wide model handle. Built once at startup and shared read-only
/// with every request; `classifier` stays `None` when no model could be loaded.
#[derive(Clone)]
pub struct Predictor {
    classifier: Option<Arc<dyn Classifier>>,
    preprocessor: Preprocessor,
}

impl Predictor {
    pub fn new(classifier: Option<Arc<dyn Classifier>>, preprocessor: Preprocessor) -> Self {
        Self {
            classifier,
            preprocessor,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn predict(&self, image_data: &[u8]) -> Result<Prediction, InferenceError> {
        let classifier = self
            .classifier
            .as_ref()
            .ok_or(InferenceError::ModelNotLoaded)?;
        let tensor = self.preprocessor.tensor(image_data)?;
        let scores = classifier.forward(tensor)?;
        Prediction::from_scores(&scores)
    }
}
