use std::borrow::Cow;

use crate::error::ClientError;
use crate::JsonObject;

use super::decode::{decode_object, require_list};
use super::descriptor::Endpoint;

/// `GET /models`, optionally filtered by `type` and `sub_type`.
#[derive(Debug, Clone, Default)]
pub struct ListModelsRequest {
    pub model_type: Option<String>,
    pub sub_type: Option<String>,
}

impl ListModelsRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_type(mut self, model_type: impl Into<String>) -> Self {
        self.model_type = Some(model_type.into());
        self
    }

    #[must_use]
    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }
}

impl Endpoint for ListModelsRequest {
    fn method(&self) -> http::Method {
        http::Method::GET
    }

    fn path(&self) -> Cow<'_, str> {
        let filters = [
            ("type", self.model_type.as_deref()),
            ("sub_type", self.sub_type.as_deref()),
        ];
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        for (key, value) in filters {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                query.append_pair(key, value);
                any = true;
            }
        }
        if any {
            Cow::Owned(format!("/models?{}", query.finish()))
        } else {
            Cow::Borrowed("/models")
        }
    }

    fn build_body(&self) -> Option<JsonObject> {
        None
    }

    fn validate(&self) -> Result<(), ClientError> {
        Ok(())
    }

    fn decode(&self, body: &[u8]) -> Result<JsonObject, ClientError> {
        let object = decode_object(body)?;
        require_list(&object, "data")?;
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_with_filters() {
        assert_eq!(ListModelsRequest::new().path(), "/models");
        assert_eq!(
            ListModelsRequest::new().with_type("text").path(),
            "/models?type=text"
        );
        assert_eq!(
            ListModelsRequest::new()
                .with_type("image")
                .with_sub_type("text-to-image")
                .path(),
            "/models?type=image&sub_type=text-to-image"
        );
        assert_eq!(
            ListModelsRequest::new().with_sub_type("a b").path(),
            "/models?sub_type=a+b"
        );
    }

    #[test]
    fn test_get_without_body() {
        let request = ListModelsRequest::new();
        assert_eq!(request.method(), http::Method::GET);
        assert!(request.build_body().is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_decode_requires_data_list() {
        let request = ListModelsRequest::new();
        let decoded = request
            .decode(br#"{"object":"list","data":[{"id":"Qwen/Qwen2.5-7B-Instruct"}]}"#)
            .unwrap();
        assert_eq!(decoded["data"][0]["id"], "Qwen/Qwen2.5-7B-Instruct");
        assert!(matches!(
            request.decode(br#"{"object":"list"}"#),
            Err(ClientError::Decode(_))
        ));
        assert!(request.decode(br#"{"data":{}}"#).is_err());
    }
}
