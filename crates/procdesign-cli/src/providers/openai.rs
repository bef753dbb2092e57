use super::prompt::{parse_design, system_prompt, user_prompt};
use crate::config::models::ProposerSettings;
use crate::error::Result;
use async_trait::async_trait;
use procdesign::core::models::design::ProcessDesign;
use procdesign::engine::proposer::{DesignProposer, ProposalError, ProposalRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Proposes designs through an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAiProposer {
    client: Client,
    settings: ProposerSettings,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
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

impl OpenAiProposer {
    pub fn new(settings: ProposerSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.settings.base_url)
    }

    fn build_request(&self, request: &ProposalRequest<'_>) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(system_prompt()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(user_prompt(request)),
                },
            ],
            temperature: self.settings.temperature,
        }
    }
}

#[async_trait]
impl DesignProposer for OpenAiProposer {
    async fn propose(&self, request: ProposalRequest<'_>) -> std::result::Result<ProcessDesign, ProposalError> {
        let body = self.build_request(&request);
        debug!(
            model = %self.settings.model,
            iteration = request.iteration,
            "Requesting a design from the language model."
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProposalError::Unavailable(format!(
                "API returned {}: {}",
                status,
                text.trim()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| transport_error("failed to read response", e))?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProposalError::Malformed(format!("unexpected response body: {}", e)))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProposalError::Malformed("response contains no message".to_string()))?;
        trace!("Model reply: {}", content);

        parse_design(&content)
    }

    fn name(&self) -> &str {
        &self.settings.model
    }
}

/// A client-side timeout is retried like any other late answer; other transport failures are fatal.
fn transport_error(context: &str, e: reqwest::Error) -> ProposalError {
    if e.is_timeout() {
        ProposalError::TimedOut(format!("{}: {}", context, e))
    } else {
        ProposalError::Unavailable(format!("{}: {}", context, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use procdesign::core::models::material::RawMaterial;
    use procdesign::core::models::specification::ProductSpecification;
    use procdesign::engine::history::DesignHistory;
    use serde_json::json;
    use std::time::Duration;

    fn settings(base_url: String) -> ProposerSettings {
        ProposerSettings {
            model: "gpt-test".to_string(),
            base_url,
            api_key: "sk-test".to_string(),
            temperature: 0.2,
            timeout: Duration::from_secs(5),
        }
    }

    fn completion(content: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    async fn propose(server_url: String) -> std::result::Result<ProcessDesign, ProposalError> {
        let proposer = OpenAiProposer::new(settings(server_url)).unwrap();
        let materials = vec![RawMaterial::new("Water")];
        let mut spec = ProductSpecification::new("Steam");
        spec.chemical_formula = Some("H2O".to_string());
        let specifications = vec![spec];
        let history = DesignHistory::new();
        proposer
            .propose(ProposalRequest {
                iteration: 1,
                materials: &materials,
                specifications: &specifications,
                feedback: None,
                history: &history,
            })
            .await
    }

    #[tokio::test]
    async fn returns_the_parsed_design() {
        let mut server = mockito::Server::new_async().await;
        let reply = r#"```json
{"units": [{"id": "H1", "type": "Heater"}],
 "connections": [{"stream": "FEED_1", "destination": "H1"}, {"stream": "STEAM", "source": "H1"}]}
```"#;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-test", "temperature": 0.2})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(reply))
            .create_async()
            .await;

        let design = propose(server.url()).await.unwrap();
        assert_eq!(design.units.len(), 1);
        assert_eq!(design.units[0].block_type, "Heater");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_errors_are_unavailable() {
        for status in [401, 429, 503] {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("POST", "/v1/chat/completions")
                .with_status(status)
                .with_body("{\"error\": \"nope\"}")
                .create_async()
                .await;

            let err = propose(server.url()).await.unwrap_err();
            assert!(matches!(err, ProposalError::Unavailable(_)), "{status}");
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let err = propose("http://127.0.0.1:9".to_string()).await.unwrap_err();
        assert!(matches!(err, ProposalError::Unavailable(_)));
    }

    #[tokio::test]
    async fn slow_replies_time_out() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body_from_request(|_| {
                std::thread::sleep(Duration::from_secs(1));
                completion("{}").into_bytes()
            })
            .create_async()
            .await;

        let mut slow = settings(server.url());
        slow.timeout = Duration::from_millis(100);
        let proposer = OpenAiProposer::new(slow).unwrap();
        let history = DesignHistory::new();
        let err = proposer
            .propose(ProposalRequest {
                iteration: 1,
                materials: &[],
                specifications: &[],
                feedback: None,
                history: &history,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProposalError::TimedOut(_)), "{err}");
    }

    #[tokio::test]
    async fn unusable_replies_are_malformed() {
        let bodies = [
            completion("I would use a distillation column."),
            json!({"choices": []}).to_string(),
            "not json".to_string(),
        ];
        for body in bodies {
            let mut server = mockito::Server::new_async().await;
            let _mock = server
                .mock("POST", "/v1/chat/completions")
                .with_status(200)
                .with_body(body.clone())
                .create_async()
                .await;

            let err = propose(server.url()).await.unwrap_err();
            assert!(matches!(err, ProposalError::Malformed(_)), "{body}");
        }
    }
}
