use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The diagnostic categories the bone X-ray classifier distinguishes.
///
/// Declaration order is the order of the model's output vector.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    AsRefStr,
)]
pub enum BoneClass {
    Normal,
    Osteopenia,
    Osteoporosis,
}

impl BoneClass {
    pub const ALL: [BoneClass; 3] = [
        BoneClass::Normal,
        BoneClass::Osteopenia,
        BoneClass::Osteoporosis,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// A persisted prediction, exactly as written to `<report_id>.json`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Report {
    pub image_id: String,
    pub predicted_class: BoneClass,
    pub confidence: f64,
    pub class_probabilities: BTreeMap<BoneClass, f64>,
    pub timestamp: String,
    // Never populated yet; reserved for per-user reports.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A report together with the identifier derived from its file name.
///
/// Returned by the predict, list and fetch endpoints.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReportRecord {
    pub report_id: String,
    #[serde(flatten)]
    pub report: Report,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UploadResponse {
    pub image_id: String,
    pub filename: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}
