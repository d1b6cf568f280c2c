use std::future::Future;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use crate::config::Settings;
use crate::error::{Error, Result};

const VISION_PROMPT: &str = "Describe the image in detail. If there is any text present, fully transcribe it. Do not use any formating, keep it short (1-3 paragraphs).";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// 图片描述与文本嵌入服务
pub trait VisionService {
    /// 生成 PNG 图片的文字描述，`context` 为可选的补充信息
    fn describe(
        &self,
        image: &[u8],
        context: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// 计算文本的嵌入向量
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;
}

/// OpenAI 兼容的 OpenRouter 接口
pub struct OpenRouter {
    client: Client,
    api_base: String,
    vision_model: String,
    embedding_model: String,
}

impl OpenRouter {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", settings.api_key.trim()))
            .map_err(|_| Error::Config("api_key contains invalid characters".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder().timeout(REQUEST_TIMEOUT).default_headers(headers).build()?;

        Ok(Self {
            client,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            vision_model: settings.vision_model.clone(),
            embedding_model: settings.embedding_model.clone(),
        })
    }
}

impl VisionService for OpenRouter {
    async fn describe(&self, image: &[u8], context: Option<&str>) -> Result<String> {
        let prompt = match context {
            Some(context) => format!("{VISION_PROMPT} Additional context: {context}"),
            None => VISION_PROMPT.to_string(),
        };
        let payload = json!({
            "model": self.vision_model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/png;base64,{}", STANDARD.encode(image)) },
                    },
                ],
            }],
        });

        debug!("请求图片描述: model = {}, {} bytes", self.vision_model, image.len());
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .json(&payload)
            .send()
            .await?;
        let data: ChatResponse = check_status(resp, "Vision").await?.json().await?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Collaborator("Vision API returned no choices".to_string()))?;
        let description = match choice.message.content {
            Some(MessageContent::Text(text)) => text.trim().to_string(),
            Some(MessageContent::Parts(parts)) => parts
                .iter()
                .filter(|part| part.kind == "text")
                .filter_map(|part| part.text.as_deref())
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            None => String::new(),
        };

        if description.is_empty() {
            return Err(Error::Collaborator("Vision API returned an empty description".to_string()));
        }
        Ok(description)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let payload = json!({
            "model": self.embedding_model,
            "input": text,
            "encoding_format": "float",
        });

        debug!("请求文本嵌入: model = {}, {} chars", self.embedding_model, text.len());
        let resp = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .json(&payload)
            .send()
            .await?;
        let data: EmbeddingResponse = check_status(resp, "Embedding").await?.json().await?;

        let embedding = data
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::Collaborator("Embedding API returned no data".to_string()))?
            .embedding;
        if embedding.is_empty() {
            return Err(Error::Collaborator("Embedding missing in response".to_string()));
        }

        debug!("嵌入向量维数: {}", embedding.len());
        Ok(embedding)
    }
}

async fn check_status(resp: Response, kind: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let body: String = body.chars().take(200).collect();
    Err(Error::Collaborator(format!("{kind} API error {}: {body}", status.as_u16())))
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<MessageContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> OpenRouter {
        let settings = Settings {
            api_key: "test-key".to_string(),
            api_base: format!("{}/api/v1/", server.uri()),
            ..Settings::default()
        };
        OpenRouter::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn describe_text_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": crate::config::DEFAULT_VISION_MODEL })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "  a red circle \n" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let description = client(&server).describe(b"png", Some("test")).await.unwrap();
        assert_eq!(description, "a red circle");
    }

    #[tokio::test]
    async fn describe_content_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": [
                    { "type": "text", "text": "first part " },
                    { "type": "image_url" },
                    { "type": "text", "text": "second part" },
                ] } }]
            })))
            .mount(&server)
            .await;

        let description = client(&server).describe(b"png", None).await.unwrap();
        assert_eq!(description, "first part second part");
    }

    #[tokio::test]
    async fn describe_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = client(&server).describe(b"png", None).await.unwrap_err();
        assert!(matches!(err, Error::Collaborator(ref msg) if msg == "Vision API error 401: invalid key"));
    }

    #[tokio::test]
    async fn describe_no_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client(&server).describe(b"png", None).await.unwrap_err();
        assert!(matches!(err, Error::Collaborator(_)));
    }

    #[tokio::test]
    async fn embed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/embeddings"))
            .and(body_partial_json(json!({ "input": "a cat", "encoding_format": "float" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "embedding": [0.5, -0.25, 1.0] }]
            })))
            .mount(&server)
            .await;

        let embedding = client(&server).embed("a cat").await.unwrap();
        assert_eq!(embedding, vec![0.5, -0.25, 1.0]);
    }

    #[tokio::test]
    async fn embed_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let err = client(&server).embed("a cat").await.unwrap_err();
        assert!(matches!(err, Error::Collaborator(ref msg) if msg.contains("no data")));
    }
}
