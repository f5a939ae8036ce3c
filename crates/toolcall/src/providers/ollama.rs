//! Local Ollama server client.

use super::ProviderConfig;
use crate::error::ModelError;
use serde_json::Value;
use tracing::{debug, warn};

/// Client for the local inference server's model listing.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    api_base: String,
}

impl OllamaClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(config.api_base())
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Names of the locally installed models.
    ///
    /// Any failure (unreachable server, bad status, malformed body, missing
    /// `models` array) yields an empty list.
    pub async fn list_models(&self) -> Vec<String> {
        match self.fetch_models().await {
            Ok(models) => {
                debug!(count = models.len(), "listed local models");
                models
            }
            Err(e) => {
                warn!(api_base = %self.api_base, error = %e, "could not list local models");
                Vec::new()
            }
        }
    }

    async fn fetch_models(&self) -> Result<Vec<String>, ModelError> {
        let url = format!("{}/api/tags", self.api_base);
        let response = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        let models = body
            .get("models")
            .and_then(Value::as_array)
            .ok_or_else(|| ModelError::InvalidResponse("missing `models` array".into()))?;

        Ok(models
            .iter()
            .filter_map(|model| model.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Provider;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .and(header("accept", "application/json"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn lists_model_names() {
        let server = serve(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3.2:latest", "size": 2019393189u64},
                {"name": "qwen2.5-coder:7b"},
                {"size": 1}
            ]
        })))
        .await;

        let config = ProviderConfig::new(Provider::Ollama, format!("{}/", server.uri()), None);
        let models = OllamaClient::from_config(&config).list_models().await;
        assert_eq!(models, ["llama3.2:latest", "qwen2.5-coder:7b"]);
    }

    #[tokio::test]
    async fn malformed_body_yields_empty_list() {
        let server = serve(ResponseTemplate::new(200).set_body_string("<html>nope</html>")).await;
        assert!(OllamaClient::new(server.uri()).list_models().await.is_empty());
    }

    #[tokio::test]
    async fn missing_models_field_yields_empty_list() {
        let server = serve(ResponseTemplate::new(200).set_body_json(json!({"tags": []}))).await;
        assert!(OllamaClient::new(server.uri()).list_models().await.is_empty());

        let server = serve(ResponseTemplate::new(200).set_body_json(json!({"models": "x"}))).await;
        assert!(OllamaClient::new(server.uri()).list_models().await.is_empty());
    }

    #[tokio::test]
    async fn error_status_yields_empty_list() {
        let server = serve(ResponseTemplate::new(500)).await;
        assert!(OllamaClient::new(server.uri()).list_models().await.is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_yields_empty_list() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);
        assert!(OllamaClient::new(uri).list_models().await.is_empty());
    }
}
