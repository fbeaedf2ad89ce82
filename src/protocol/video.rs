use std::borrow::Cow;

use serde_json::Value;

use crate::error::ClientError;
use crate::JsonObject;

use super::decode::{decode_object, require_present};
use super::descriptor::{merge_options, require_non_blank, Endpoint};
use super::images::validate_image_size;

/// `POST /video/submit`; the reply carries a `requestId` to poll with.
#[derive(Debug, Clone, Default)]
pub struct VideoSubmitRequest {
    pub model: String,
    pub prompt: String,
    pub image_size: Option<String>,
    pub negative_prompt: Option<String>,
    pub image: Option<String>,
    pub seed: Option<u64>,
    pub options: JsonObject,
}

impl VideoSubmitRequest {
    #[must_use]
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_image_size(mut self, size: impl Into<String>) -> Self {
        self.image_size = Some(size.into());
        self
    }

    #[must_use]
    pub fn with_negative_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(prompt.into());
        self
    }

    /// Reference image (URL or data URI) for image-to-video models.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

impl Endpoint for VideoSubmitRequest {
    fn path(&self) -> Cow<'_, str> {
        Cow::Borrowed("/video/submit")
    }

    fn build_body(&self) -> Option<JsonObject> {
        let mut body = JsonObject::new();
        body.insert("model".into(), Value::String(self.model.clone()));
        body.insert("prompt".into(), Value::String(self.prompt.clone()));
        let optional = [
            ("image_size", &self.image_size),
            ("negative_prompt", &self.negative_prompt),
            ("image", &self.image),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                body.insert(key.into(), Value::String(value.clone()));
            }
        }
        if let Some(seed) = self.seed {
            body.insert("seed".into(), Value::from(seed));
        }
        merge_options(&mut body, &self.options);
        Some(body)
    }

    fn options(&self) -> Option<&JsonObject> {
        Some(&self.options)
    }

    fn validate(&self) -> Result<(), ClientError> {
        require_non_blank(&self.model, "model")?;
        require_non_blank(&self.prompt, "prompt")?;
        let size = self
            .image_size
            .as_deref()
            .or_else(|| self.options.get("image_size").and_then(Value::as_str));
        validate_image_size(size)
    }

    fn decode(&self, body: &[u8]) -> Result<JsonObject, ClientError> {
        let object = decode_object(body)?;
        require_present(&object, "requestId")?;
        Ok(object)
    }
}

/// `POST /video/status` for a previously submitted job.
#[derive(Debug, Clone)]
pub struct VideoStatusRequest {
    pub request_id: String,
}

impl VideoStatusRequest {
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

impl Endpoint for VideoStatusRequest {
    fn path(&self) -> Cow<'_, str> {
        Cow::Borrowed("/video/status")
    }

    fn build_body(&self) -> Option<JsonObject> {
        let mut body = JsonObject::new();
        body.insert("requestId".into(), Value::String(self.request_id.clone()));
        Some(body)
    }

    fn validate(&self) -> Result<(), ClientError> {
        require_non_blank(&self.request_id, "requestId")
    }
}
