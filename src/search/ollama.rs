//! Ollama embedding backend over its HTTP API.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::embedding::{EmbeddingProvider, ProviderError};
use crate::core::config::EmbeddingConfig;
use crate::core::note::Embedding;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    model_id: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unreachable(format!("failed to build HTTP client: {}", e)))?;
        let model = model.into();

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model_id: format!("ollama:{}", model),
            model,
            timeout,
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
        Self::new(config.base_url(), config.model.clone(), config.timeout())
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else if e.is_decode() {
            ProviderError::Decode(e.to_string())
        } else {
            ProviderError::Unreachable(e.to_string())
        }
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        let start = Instant::now();

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest {
                model: &self.model,
                input: [text],
            })
            .send()
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().map_err(|e| self.map_transport_error(e))?;
        let embedding = parse_embedding(&body)?;

        tracing::debug!(
            model = %self.model,
            dimensions = embedding.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "embedding complete"
        );
        Ok(embedding)
    }
}

fn parse_embedding(body: &str) -> Result<Embedding, ProviderError> {
    let parsed: EmbedResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    match parsed.embeddings.into_iter().next() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ProviderError::EmptyEmbedding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves exactly one request with the given status line and body.
    fn serve_once(status: &'static str, body: &'static str, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
            let mut request_body = vec![0u8; content_length];
            let _ = reader.read_exact(&mut request_body);

            thread::sleep(delay);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = reader.get_mut().write_all(response.as_bytes());
        });

        format!("http://{}", addr)
    }

    #[test]
    fn test_parse_embedding() {
        let emb = parse_embedding(r#"{"model":"m","embeddings":[[0.1,0.2,0.3]]}"#).unwrap();
        assert_eq!(emb, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_parse_empty_embedding() {
        assert!(matches!(
            parse_embedding(r#"{"embeddings":[]}"#),
            Err(ProviderError::EmptyEmbedding)
        ));
        assert!(matches!(
            parse_embedding(r#"{"embeddings":[[]]}"#),
            Err(ProviderError::EmptyEmbedding)
        ));
        assert!(matches!(parse_embedding("not json"), Err(ProviderError::Decode(_))));
    }

    #[test]
    fn test_embed_success() {
        let url = serve_once("200 OK", r#"{"embeddings":[[1.0,0.0,0.5]]}"#, Duration::ZERO);
        let provider = OllamaProvider::new(url, "nomic-embed-text", Duration::from_secs(5)).unwrap();

        assert_eq!(provider.model_id(), "ollama:nomic-embed-text");
        assert_eq!(provider.embed("hello").unwrap(), vec![1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_embed_error_status() {
        let url = serve_once("500 Internal Server Error", r#"{"error":"model not found"}"#, Duration::ZERO);
        let provider = OllamaProvider::new(url, "missing", Duration::from_secs(5)).unwrap();

        match provider.embed("hello") {
            Err(ProviderError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("model not found"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[test]
    fn test_embed_timeout() {
        let url = serve_once("200 OK", r#"{"embeddings":[[1.0]]}"#, Duration::from_secs(3));
        let provider = OllamaProvider::new(url, "slow", Duration::from_millis(200)).unwrap();

        let err = provider.embed("hello").unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)), "got {:?}", err);
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_embed_unreachable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let provider =
            OllamaProvider::new(format!("http://127.0.0.1:{}", port), "m", Duration::from_secs(2)).unwrap();

        let err = provider.embed("hello").unwrap_err();
        assert!(err.is_unavailable(), "got {:?}", err);
    }
}
