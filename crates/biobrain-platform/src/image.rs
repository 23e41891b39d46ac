//! Pollinations image service.
//!
//! The service renders on GET, so "generating" an image is just building
//! its URL; the browser fetches the bytes when the `<img>` is shown.

use async_trait::async_trait;

use biobrain_core::ports::ImagePort;
use biobrain_types::{ChatError, Result, config::ImageConfig};

pub struct PollinationsImages {
    config: ImageConfig,
}

impl PollinationsImages {
    pub fn new(config: ImageConfig) -> Self {
        Self { config }
    }

    pub fn url_for(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::Other("Empty diagram prompt".to_string()));
        }
        Ok(format!(
            "{}/{}?width={}&height={}&nologo={}&enhance={}&model={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(prompt),
            self.config.width,
            self.config.height,
            self.config.nologo,
            self.config.enhance,
            urlencoding::encode(&self.config.model),
        ))
    }
}

#[async_trait(?Send)]
impl ImagePort for PollinationsImages {
    async fn image_url(&self, prompt: &str) -> Result<String> {
        self.url_for(prompt)
    }
}
