use ndarray::Array4;
use std::path::Path;
use std::sync::Arc;

use super::InferenceError;
use crate::config::ModelConfig;

/// A loaded network that maps one preprocessed batch to a flat score vector.
pub trait Classifier: Send + Sync {
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// Loads the configured model, leaving the service without one when the
/// artifact is missing or fails to load.
pub fn load_classifier(config: &ModelConfig) -> Option<Arc<dyn Classifier>> {
    if !config.path.exists() {
        log::warn!(
            "Model file {} does not exist. API will not be able to make predictions.",
            config.path.display()
        );
        return None;
    }

    match open(&config.path, config) {
        Ok(classifier) => {
            log::info!("Model loaded successfully from {}", config.path.display());
            Some(classifier)
        }
        Err(e) => {
            log::error!("Error loading model {}: {}", config.path.display(), e);
            None
        }
    }
}

#[cfg(feature = "torch")]
fn open(path: &Path, config: &ModelConfig) -> Result<Arc<dyn Classifier>, InferenceError> {
    Ok(Arc::new(torch::TorchClassifier::load(path, config.device)?))
}

#[cfg(not(feature = "torch"))]
fn open(path: &Path, _config: &ModelConfig) -> Result<Arc<dyn Classifier>, InferenceError> {
    Err(InferenceError::Model(format!(
        "cannot load {}: built without the `torch` feature",
        path.display()
    )))
}

#[cfg(feature = "torch")]
mod torch {
    use ndarray::Array4;
    use std::path::Path;
    use std::sync::Mutex;
    use tch::{CModule, Device, Kind, Tensor};

    use super::Classifier;
    use crate::config::DeviceSelection;
    use crate::inference::InferenceError;

    impl From<tch::TchError> for InferenceError {
        fn from(err: tch::TchError) -> Self {
            InferenceError::Model(err.to_string())
        }
    }

    /// A TorchScript module. Calls are serialised through the mutex since the
    /// module is not safe to run concurrently.
    pub struct TorchClassifier {
        model: Mutex<CModule>,
        device: Device,
    }

    impl TorchClassifier {
        pub fn load(model_path: &Path, selection: DeviceSelection) -> Result<Self, InferenceError> {
            let device = match selection {
                DeviceSelection::Auto => Device::cuda_if_available(),
                DeviceSelection::Cpu => Device::Cpu,
                DeviceSelection::Cuda => Device::Cuda(0),
            };
            log::info!("Loading TorchScript module on {:?}", device);
            let mut model = CModule::load_on_device(model_path, device)?;
            model.set_eval();
            Ok(Self {
                model: Mutex::new(model),
                device,
            })
        }
    }

    impl Classifier for TorchClassifier {
        fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
            let data = input.as_standard_layout();
            let data = data.as_slice().ok_or_else(|| {
                InferenceError::Preprocessing("input tensor is not contiguous".into())
            })?;
            let tensor = Tensor::from_slice(data).reshape(shape.as_slice()).to_device(self.device);

            let output = {
                let model = self.model.lock().map_err(|_| InferenceError::Poisoned)?;
                tch::no_grad(|| model.forward_ts(&[tensor]))?
            };

            let output_flat = output.to_kind(Kind::Float).to_device(Device::Cpu).view([-1]);
            Ok(Vec::<f32>::try_from(&output_flat)?)
        }
    }
}
