use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config/osteoscan.yaml";
const BYTES_PER_MB: usize = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub image: ImageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    #[cfg_attr(not(feature = "torch"), allow(dead_code))]
    pub device: DeviceSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSelection {
    Auto,
    Cpu,
    Cuda,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub size: Vec<u32>,
    pub channels_last: bool,
    pub preprocessing: PreprocessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub resize_method: ResizeMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMethod {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            body_limit_mb: 20,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./public/bone_data"),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./models/osteoporosis_resnet50.pt"),
            device: DeviceSelection::Auto,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            size: vec![224, 224],
            channels_last: false,
            preprocessing: PreprocessingConfig::default(),
        }
    }
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            resize_method: ResizeMethod::Triangle,
        }
    }
}

impl std::str::FromStr for DeviceSelection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DeviceSelection::Auto),
            "cpu" => Ok(DeviceSelection::Cpu),
            "cuda" => Ok(DeviceSelection::Cuda),
            _ => Err(()),
        }
    }
}

impl ImageConfig {
    /// Target (width, height). A single value means a square.
    pub fn dimensions(&self) -> (u32, u32) {
        match self.size.as_slice() {
            [side] => (*side, *side),
            [width, height, ..] => (*width, *height),
            [] => (224, 224),
        }
    }
}

impl AppConfig {
    /// Loads the YAML file named by `OSTEOSCAN_CONFIG` (or the default path when
    /// it exists), then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("OSTEOSCAN_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { key: "PORT", value: port })?;
        }
        if let Some(mb) = lookup("BODY_LIMIT_MB") {
            self.server.body_limit_mb = mb
                .parse::<usize>()
                .ok()
                .filter(|limit| limit.checked_mul(BYTES_PER_MB).is_some())
                .ok_or(ConfigError::InvalidOverride {
                    key: "BODY_LIMIT_MB",
                    value: mb,
                })?;
        }
        if let Some(dir) = lookup("OSTEOSCAN_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("OSTEOSCAN_MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(device) = lookup("OSTEOSCAN_DEVICE") {
            self.model.device = device.parse().map_err(|_| ConfigError::InvalidOverride {
                key: "OSTEOSCAN_DEVICE",
                value: device,
            })?;
        }
        Ok(())
    }

    pub fn images_dir(&self) -> PathBuf {
        self.storage.data_dir.join("images")
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.storage.data_dir.join("reports")
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.server.body_limit_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
