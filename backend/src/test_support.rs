use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use shared::{BoneClass, Report};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::inference::{Classifier, InferenceError};

/// A scratch directory removed on drop.
pub struct TempDir(PathBuf);

impl TempDir {
    pub fn new() -> Self {
        let path = std::env::temp_dir().join(format!("osteoscan-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

pub fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn sample_report(image_id: &str, timestamp: &str) -> Report {
    let class_probabilities: BTreeMap<BoneClass, f64> = [
        (BoneClass::Normal, 30.0),
        (BoneClass::Osteopenia, 60.0),
        (BoneClass::Osteoporosis, 10.0),
    ]
    .into_iter()
    .collect();
    Report {
        image_id: image_id.to_string(),
        predicted_class: BoneClass::Osteopenia,
        confidence: 60.0,
        class_probabilities,
        timestamp: timestamp.to_string(),
        user_id: None,
    }
}

/// Returns fixed scores and records the shape of the last input it saw.
pub struct StubClassifier {
    scores: Vec<f32>,
    last_shape: Mutex<Option<Vec<usize>>>,
}

impl StubClassifier {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            last_shape: Mutex::new(None),
        }
    }

    pub fn last_shape(&self) -> Option<Vec<usize>> {
        self.last_shape.lock().unwrap().clone()
    }
}

impl Classifier for StubClassifier {
    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        *self.last_shape.lock().unwrap() = Some(input.shape().to_vec());
        Ok(self.scores.clone())
    }
}
