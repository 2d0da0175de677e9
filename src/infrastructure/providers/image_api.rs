//! Provider speaking the JSON images API shared by both vendors

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use super::http_client::{HttpClient, HttpClientTrait};
use crate::domain::image::{
    GeneratedImage, ImageProvider, ImageRequest, ModelVariant, ProviderError, ProviderKind,
};

/// Image provider calling `POST {base_url}/v1/images/generations`
#[derive(Debug)]
pub struct HttpImageProvider<C: HttpClientTrait = HttpClient> {
    client: C,
    kind: ProviderKind,
    variant: ModelVariant,
    auth_header: String,
    base_url: String,
}

impl<C: HttpClientTrait> HttpImageProvider<C> {
    pub fn new(
        client: C,
        kind: ProviderKind,
        variant: ModelVariant,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let auth_header = format!("Bearer {}", api_key.into());
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            kind,
            variant,
            auth_header,
            base_url,
        }
    }

    fn generations_url(&self) -> String {
        format!("{}/v1/images/generations", self.base_url)
    }

    fn build_request(&self, request: &ImageRequest) -> serde_json::Value {
        serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "size": request.size.to_string(),
            "n": 1,
            "response_format": "b64_json",
        })
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("Authorization", self.auth_header.as_str()),
            ("Content-Type", "application/json"),
        ]
    }

    async fn parse_response(&self, json: serde_json::Value) -> Result<GeneratedImage, ProviderError> {
        let response: ImagesResponse = serde_json::from_value(json).map_err(|e| {
            ProviderError::temporary(format!("Failed to parse response: {}", e))
        })?;

        let datum = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::temporary("No images in response"))?;

        let bytes = match (datum.b64_json, datum.url) {
            (Some(encoded), _) => STANDARD.decode(encoded.trim()).map_err(|e| {
                ProviderError::temporary(format!("Invalid base64 image payload: {}", e))
            })?,
            (None, Some(url)) => {
                debug!(provider = %self.kind, "Downloading image from returned URL");
                self.client.get_bytes(&url).await?
            }
            (None, None) => {
                return Err(ProviderError::temporary("Response carried neither b64_json nor url"));
            }
        };

        if bytes.is_empty() {
            return Err(ProviderError::temporary("Provider returned an empty image"));
        }

        let image = GeneratedImage::new(bytes);
        Ok(match datum.revised_prompt {
            Some(prompt) => image.with_revised_prompt(prompt),
            None => image,
        })
    }
}

#[async_trait]
impl<C: HttpClientTrait> ImageProvider for HttpImageProvider<C> {
    async fn generate(&self, request: &ImageRequest) -> Result<GeneratedImage, ProviderError> {
        let url = self.generations_url();
        let body = self.build_request(request);

        let response = self.client.post_json(&url, self.headers(), &body).await?;
        self.parse_response(response).await
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn variant(&self) -> ModelVariant {
        self.variant.clone()
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
    revised_prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::image::{ErrorKind, ImageSize};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

    fn create_test_provider(base_url: &str) -> HttpImageProvider {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        HttpImageProvider::new(
            HttpClient::from_client(client),
            ProviderKind::OpenAi,
            ModelVariant::new("dall-e-3", ImageSize::square(1024)),
            "test-api-key",
            base_url,
        )
    }

    fn request(provider: &HttpImageProvider) -> ImageRequest {
        ImageRequest::new("a lotus pond at dawn", &provider.variant())
    }

    #[tokio::test]
    async fn test_generate_decodes_b64_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .and(header("Authorization", "Bearer test-api-key"))
            .and(body_partial_json(json!({
                "model": "dall-e-3",
                "size": "1024x1024",
                "n": 1,
                "response_format": "b64_json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "created": 1704067200,
                "data": [{
                    "b64_json": STANDARD.encode(PNG_MAGIC),
                    "revised_prompt": "a serene lotus pond at dawn"
                }]
            })))
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let image = provider.generate(&request(&provider)).await.unwrap();

        assert_eq!(image.bytes, PNG_MAGIC);
        assert_eq!(image.extension(), "png");
        assert_eq!(image.revised_prompt.as_deref(), Some("a serene lotus pond at dawn"));
    }

    #[tokio::test]
    async fn test_generate_downloads_url_payload() {
        let mock_server = MockServer::start().await;
        let image_url = format!("{}/files/image.png", mock_server.uri());

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "url": image_url }] })),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/files/image.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(PNG_MAGIC))
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let image = provider.generate(&request(&provider)).await.unwrap();

        assert_eq!(image.bytes, PNG_MAGIC);
    }

    async fn error_for(status: u16, body: &str) -> ProviderError {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        provider.generate(&request(&provider)).await.unwrap_err()
    }

    #[tokio::test]
    async fn test_status_classification() {
        let throttled = error_for(429, r#"{"error":{"message":"Rate limit reached"}}"#).await;
        assert_eq!(throttled.kind, ErrorKind::RateLimit);
        assert_eq!(throttled.status, Some(429));

        let quota = error_for(429, r#"{"error":{"code":"insufficient_quota"}}"#).await;
        assert_eq!(quota.kind, ErrorKind::Quota);

        assert_eq!(error_for(402, "payment required").await.kind, ErrorKind::Quota);
        assert_eq!(error_for(503, "overloaded").await.kind, ErrorKind::Temporary);
        assert_eq!(error_for(400, "content policy").await.kind, ErrorKind::ClientError);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_temporary() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "b64_json": "***not base64***" }]
            })))
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let error = provider.generate(&request(&provider)).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Temporary);
    }

    #[tokio::test]
    async fn test_empty_data_is_temporary() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&mock_server)
            .await;

        let provider = create_test_provider(&mock_server.uri());
        let error = provider.generate(&request(&provider)).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Temporary);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network() {
        // Nothing listens on the discard port
        let provider = create_test_provider("http://127.0.0.1:9");
        let error = provider.generate(&request(&provider)).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Network);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = create_test_provider("http://localhost:8080/");
        assert_eq!(
            provider.generations_url(),
            "http://localhost:8080/v1/images/generations"
        );
        assert_eq!(provider.kind(), ProviderKind::OpenAi);
    }
}
