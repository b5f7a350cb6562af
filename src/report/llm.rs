//! Chat completion client for the hosted language model.

use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub struct ChatClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatClient {
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    /// Reads the API key from `key_var`, loading `.env` first. A missing key
    /// is not an error here; every request will fail instead.
    pub fn from_env(endpoint: &str, model: &str, key_var: &str) -> Result<Self> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var(key_var).ok().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!(variable = key_var, "API key not set; report prompts will fail");
        }

        Self::new(endpoint, model, api_key)
    }

    /// Sends one user message and returns the reply text, or `None` after
    /// printing why the request failed.
    pub async fn get_response(&self, prompt: &str) -> Option<String> {
        match self.complete(prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                println!("Error getting response: {:#}", e);
                warn!(model = %self.model, error = %e, "chat completion failed");
                None
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("no API key configured"))?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("request failed with status {}: {}", status, body.trim());
        }

        let body: ChatResponse = response.json().await?;
        first_message(body)
    }
}

fn first_message(body: ChatResponse) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow!("response contained no message"))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_serialise_single_user_message() {
        let request = ChatRequest {
            model: "llama-3.3-70b-versatile",
            messages: vec![ChatMessage {
                role: "user",
                content: "Summarise",
            }],
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "llama-3.3-70b-versatile",
                "messages": [{"role": "user", "content": "Summarise"}]
            })
        );
    }

    #[test]
    fn should_read_first_choice() {
        let body: ChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Alaska leads."}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ]
        }))
        .unwrap();

        assert_eq!(first_message(body).unwrap(), "Alaska leads.");
    }

    #[test]
    fn should_reject_empty_choices() {
        let body: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();

        assert!(first_message(body).is_err());
    }

    #[tokio::test]
    async fn should_return_none_without_api_key() {
        let client = ChatClient::new("http://127.0.0.1:9/unused", "model", None).unwrap();

        assert_eq!(client.get_response("hello").await, None);
    }
}
