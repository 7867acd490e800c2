//! Generator backed by a local Ollama server.
//!
//! - Readiness: `GET /api/tags` lists a model whose name contains the
//!   configured model tag.
//! - Generation: `POST /api/generate`, either `stream: false` or NDJSON
//!   lines carrying `response` deltas until `done`.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::OllamaConfig;
use crate::error::{Result, SynthesisError};
use crate::generator::{GenerationRequest, Generator, TextStream};

pub struct OllamaGenerator {
    config: OllamaConfig,
    base_url: String,
    client: reqwest::Client,
    current: Mutex<CancellationToken>,
}

impl OllamaGenerator {
    pub fn new(config: OllamaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {e}");
                reqwest::Client::new()
            });

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config,
            client,
            current: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Replace the cancellation token for a new call.
    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        token
    }

    fn body<'a>(&'a self, request: &'a GenerationRequest, stream: bool) -> GenerateBody<'a> {
        GenerateBody {
            model: &self.config.model,
            prompt: &request.prompt,
            stream,
            options: GenerateOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
                top_p: self.config.top_p,
                repeat_penalty: self.config.repeat_penalty,
            },
        }
    }

    async fn send(
        &self,
        request: &GenerationRequest,
        stream: bool,
        token: &CancellationToken,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);
        let send = self.client.post(url).json(&self.body(request, stream)).send();

        let response = tokio::select! {
            () = token.cancelled() => return Err(SynthesisError::Cancelled),
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Generation(format!("{status}: {text}")));
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    #[serde(default)]
    name: String,
}

/// Parse one NDJSON line. Blank lines yield `None`.
fn parse_line(line: &[u8]) -> Result<Option<GenerateChunk>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }

    let chunk: GenerateChunk = serde_json::from_slice(line)?;
    if let Some(error) = chunk.error {
        return Err(SynthesisError::Generation(error));
    }
    Ok(Some(chunk))
}

/// Split a byte stream into NDJSON lines and yield each `response` delta.
fn ndjson_deltas<S, B>(
    bytes: S,
    token: CancellationToken,
) -> impl Stream<Item = Result<String>> + Send + 'static
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();
        let mut done = false;

        'read: loop {
            let next = tokio::select! {
                biased;
                () = token.cancelled() => Some(Err(SynthesisError::Cancelled)),
                chunk = bytes.next() => chunk.map(|c| c.map_err(SynthesisError::from)),
            };
            let Some(chunk) = next else { break };
            buffer.extend_from_slice(chunk?.as_ref());

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(parsed) = parse_line(&line)? {
                    if !parsed.response.is_empty() {
                        yield parsed.response;
                    }
                    if parsed.done {
                        done = true;
                        break 'read;
                    }
                }
            }
        }

        if !done {
            if let Some(parsed) = parse_line(&buffer)? {
                if !parsed.response.is_empty() {
                    yield parsed.response;
                }
            }
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_ready(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        let tags = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.config.ready_timeout_secs))
            .send()
            .await;

        let response = match tags {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("Ollama tags request returned {}", response.status());
                return false;
            }
            Err(e) => {
                debug!("Ollama not reachable: {e}");
                return false;
            }
        };

        match response.json::<TagsResponse>().await {
            Ok(tags) => tags
                .models
                .iter()
                .any(|m| m.name.contains(&self.config.model)),
            Err(e) => {
                warn!("Unreadable Ollama tags response: {e}");
                false
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let token = self.begin();
        debug!("Generating with model: {}", self.config.model);

        let response = self.send(request, false, &token).await?;
        let body = tokio::select! {
            () = token.cancelled() => return Err(SynthesisError::Cancelled),
            body = response.bytes() => body?,
        };

        match parse_line(&body)? {
            Some(chunk) => Ok(chunk.response),
            None => Err(SynthesisError::InvalidResponse("empty body".to_string())),
        }
    }

    async fn generate_stream(&self, request: &GenerationRequest) -> Result<TextStream> {
        let token = self.begin();
        debug!("Streaming with model: {}", self.config.model);

        let response = self.send(request, true, &token).await?;
        Ok(Box::pin(ndjson_deltas(response.bytes_stream(), token)))
    }

    fn cancel(&self) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer) -> OllamaGenerator {
        OllamaGenerator::new(OllamaConfig::new(server.uri(), "medgemma"))
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("What are the danger signs?", 64, 0.3)
    }

    #[tokio::test]
    async fn ready_when_model_is_listed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "llama3:8b"}, {"name": "hf.co/unsloth/medgemma-4b:Q4"}]
            })))
            .mount(&server)
            .await;

        assert!(generator(&server).is_ready().await);

        let other = OllamaGenerator::new(OllamaConfig::new(server.uri(), "qwen"));
        assert!(!other.is_ready().await);
    }

    #[tokio::test]
    async fn not_ready_when_unreachable() {
        let generator = OllamaGenerator::new(OllamaConfig::new("http://127.0.0.1:9", "medgemma"));
        assert!(!generator.is_ready().await);
    }

    #[tokio::test]
    async fn generate_sends_sampling_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "medgemma",
                "stream": false,
                "options": {"num_predict": 64, "top_p": 0.9, "repeat_penalty": 1.1}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "Refer urgently.",
                "done": true
            })))
            .mount(&server)
            .await;

        let text = generator(&server).generate(&request()).await.unwrap();
        assert_eq!(text, "Refer urgently.");
    }

    #[tokio::test]
    async fn generate_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let err = generator(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, SynthesisError::Generation(msg) if msg.contains("model crashed")));
    }

    #[tokio::test]
    async fn stream_yields_deltas_until_done() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"response\":\"Give \",\"done\":false}\n",
            "\n",
            "{\"response\":\"ORS.\",\"done\":false}\n",
            "{\"response\":\"\",\"done\":true}\n",
            "{\"response\":\"ignored\",\"done\":false}\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let stream = generator(&server).generate_stream(&request()).await.unwrap();
        let deltas: Vec<String> = stream.try_collect().await.unwrap();
        assert_eq!(deltas, vec!["Give ", "ORS."]);
    }

    #[tokio::test]
    async fn stream_error_line_is_a_fault() {
        let server = MockServer::start().await;
        let body = concat!(
            "{\"response\":\"Give \",\"done\":false}\n",
            "{\"error\":\"out of memory\"}\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let mut stream = generator(&server).generate_stream(&request()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "Give ");
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, SynthesisError::Generation(msg) if msg == "out of memory"));
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_read() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("{\"response\":\"Only line\"}"),
            )
            .mount(&server)
            .await;

        let stream = generator(&server).generate_stream(&request()).await.unwrap();
        let deltas: Vec<String> = stream.try_collect().await.unwrap();
        assert_eq!(deltas, vec!["Only line"]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_line(b"   \n").unwrap().is_none());
        assert!(parse_line(b"not json").is_err());
    }
}
