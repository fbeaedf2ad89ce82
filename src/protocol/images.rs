use std::borrow::Cow;
use std::sync::LazyLock;

use serde_json::Value;

use crate::error::ClientError;
use crate::JsonObject;

use super::decode::{decode_object, require_list};
use super::descriptor::{check_option_range, merge_options, require_non_blank, Endpoint};

static IMAGE_SIZE_RE: LazyLock<Option<regex_lite::Regex>> =
    LazyLock::new(|| regex_lite::Regex::new(r"^\d+x\d+$").ok());

fn is_image_size(size: &str) -> bool {
    IMAGE_SIZE_RE
        .as_ref()
        .is_some_and(|re| re.is_match(size))
}

/// Check a `<width>x<height>` dimension string.
pub(crate) fn validate_image_size(size: Option<&str>) -> Result<(), ClientError> {
    match size {
        Some(size) if !is_image_size(size) => Err(ClientError::Validation(format!(
            "image_size must look like <width>x<height>, got '{size}'"
        ))),
        _ => Ok(()),
    }
}

/// `POST /images/generations`.
#[derive(Debug, Clone, Default)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    pub image_size: Option<String>,
    pub batch_size: Option<u32>,
    pub num_inference_steps: Option<u32>,
    pub guidance_scale: Option<f64>,
    pub negative_prompt: Option<String>,
    pub seed: Option<u64>,
    pub options: JsonObject,
}

impl ImageGenerationRequest {
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
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    #[must_use]
    pub fn with_num_inference_steps(mut self, steps: u32) -> Self {
        self.num_inference_steps = Some(steps);
        self
    }

    #[must_use]
    pub fn with_guidance_scale(mut self, scale: f64) -> Self {
        self.guidance_scale = Some(scale);
        self
    }

    #[must_use]
    pub fn with_negative_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(prompt.into());
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

impl Endpoint for ImageGenerationRequest {
    fn path(&self) -> Cow<'_, str> {
        Cow::Borrowed("/images/generations")
    }

    fn build_body(&self) -> Option<JsonObject> {
        let mut body = JsonObject::new();
        body.insert("model".into(), Value::String(self.model.clone()));
        body.insert("prompt".into(), Value::String(self.prompt.clone()));
        if let Some(size) = &self.image_size {
            body.insert("image_size".into(), Value::String(size.clone()));
        }
        if let Some(batch) = self.batch_size {
            body.insert("batch_size".into(), Value::from(batch));
        }
        if let Some(steps) = self.num_inference_steps {
            body.insert("num_inference_steps".into(), Value::from(steps));
        }
        if let Some(scale) = self.guidance_scale {
            body.insert("guidance_scale".into(), Value::from(scale));
        }
        if let Some(negative) = &self.negative_prompt {
            body.insert("negative_prompt".into(), Value::String(negative.clone()));
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
        validate_image_size(self.image_size.as_deref())?;

        // Typed fields win over options, so check what will actually be sent.
        let Some(body) = self.build_body() else {
            return Ok(());
        };
        check_option_range(&body, "batch_size", 1.0, 4.0)?;
        check_option_range(&body, "num_inference_steps", 1.0, 100.0)?;
        check_option_range(&body, "guidance_scale", 0.0, 20.0)?;
        if self.image_size.is_none() {
            validate_image_size(body.get("image_size").and_then(Value::as_str))?;
        }
        Ok(())
    }

    fn decode(&self, body: &[u8]) -> Result<JsonObject, ClientError> {
        let object = decode_object(body)?;
        require_list(&object, "images")?;
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> ImageGenerationRequest {
        ImageGenerationRequest::new("Kwai-Kolors/Kolors", "a lighthouse at dusk")
    }

    #[test]
    fn test_body_field_order() {
        let request = base()
            .with_image_size("1024x1024")
            .with_batch_size(2)
            .with_seed(42)
            .with_option("prompt_enhancement", json!(true));
        let body = serde_json::to_string(&request.build_body().unwrap()).unwrap();
        assert_eq!(
            body,
            r#"{"model":"Kwai-Kolors/Kolors","prompt":"a lighthouse at dusk","image_size":"1024x1024","batch_size":2,"seed":42,"prompt_enhancement":true}"#
        );
    }

    #[test]
    fn test_batch_size_bounds() {
        assert!(base().with_batch_size(1).validate().is_ok());
        assert!(base().with_batch_size(4).validate().is_ok());
        assert!(base().with_batch_size(0).validate().is_err());
        let err = base().with_batch_size(5).validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_image_size_pattern() {
        assert!(base().with_image_size("512x768").validate().is_ok());
        assert!(base().with_image_size("512*768").validate().is_err());
        assert!(base().with_image_size("x512").validate().is_err());
        assert!(base()
            .with_option("image_size", json!("big"))
            .validate()
            .is_err());
    }

    #[test]
    fn test_step_and_guidance_ranges() {
        assert!(base().with_num_inference_steps(101).validate().is_err());
        assert!(base().with_guidance_scale(20.5).validate().is_err());
        assert!(base()
            .with_num_inference_steps(50)
            .with_guidance_scale(7.5)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let request = ImageGenerationRequest::new("m", "   ");
        assert!(matches!(
            request.validate(),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn test_decode_requires_images_list() {
        let request = base();
        assert!(request
            .decode(br#"{"images":[{"url":"https://cdn/x.png"}],"seed":1}"#)
            .is_ok());
        assert!(matches!(
            request.decode(br#"{"data":[]}"#),
            Err(ClientError::Decode(_))
        ));
    }
}
