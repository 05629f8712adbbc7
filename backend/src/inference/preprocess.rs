use image::imageops::FilterType;
use ndarray::Array4;

use super::InferenceError;
use crate::config::{ImageConfig, ResizeMethod};

/// Turns encoded image bytes into the batched float tensor the classifier expects.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    width: u32,
    height: u32,
    filter: FilterType,
    channels_last: bool,
}

impl From<ResizeMethod> for FilterType {
    fn from(method: ResizeMethod) -> Self {
        match method {
            ResizeMethod::Nearest => FilterType::Nearest,
            ResizeMethod::Triangle => FilterType::Triangle,
            ResizeMethod::CatmullRom => FilterType::CatmullRom,
            ResizeMethod::Gaussian => FilterType::Gaussian,
            ResizeMethod::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl From<&ImageConfig> for Preprocessor {
    fn from(config: &ImageConfig) -> Self {
        let (width, height) = config.dimensions();
        Self {
            width,
            height,
            filter: config.preprocessing.resize_method.into(),
            channels_last: config.channels_last,
        }
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::from(&ImageConfig::default())
    }
}

impl Preprocessor {
    pub fn tensor(&self, image_data: &[u8]) -> Result<Array4<f32>, InferenceError> {
        if self.width == 0 || self.height == 0 {
            return Err(InferenceError::Preprocessing(format!(
                "invalid target size {}x{}",
                self.width, self.height
            )));
        }

        let img = image::load_from_memory(image_data)?;
        let rgb = img.to_rgb8();
        let resized = image::imageops::resize(&rgb, self.width, self.height, self.filter);

        let scale = |value: u8| value as f32 / 255.0;
        let tensor = if self.channels_last {
            Array4::from_shape_fn(
                (1, self.height as usize, self.width as usize, 3),
                |(_, y, x, c)| scale(resized.get_pixel(x as u32, y as u32)[c]),
            )
        } else {
            Array4::from_shape_fn(
                (1, 3, self.height as usize, self.width as usize),
                |(_, c, y, x)| scale(resized.get_pixel(x as u32, y as u32)[c]),
            )
        };

        Ok(tensor)
    }
}
