use serde::{Deserialize, Serialize};

use hypr_script_align::{
    BRIDGE_MAX_TOKENS, BRIDGE_TEMPERATURE, BoxFuture, BridgeGenerator, GenerationError,
    GenerationReply, ReconstructionRequest,
};

use crate::{Env, Error, system_prompt, user_prompt};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// Bridge-sentence generator backed by any OpenAI-compatible
/// `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl BridgeClient {
    pub fn new(env: &Env) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(env.timeout()).build()?;

        Ok(Self {
            http,
            base_url: env.bridge_llm_base_url.trim_end_matches('/').to_string(),
            api_key: env.bridge_llm_api_key.clone(),
            model: env.bridge_llm_model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, request: &ReconstructionRequest) -> Result<GenerationReply, Error> {
        let url = format!("{}/chat/completions", self.base_url);
        let system = system_prompt();
        let user = user_prompt(request);

        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: BRIDGE_TEMPERATURE,
            max_tokens: BRIDGE_MAX_TOKENS,
        };

        let mut builder = self.http.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(request_id = request.id, model = %self.model, "bridge_completion_sent");
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(error) => {
                    tracing::debug!(%error, %status, "bridge_error_body_unreadable");
                    String::new()
                }
            };
            return Err(Error::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let completion: ChatCompletionResponse = serde_json::from_slice(&bytes)?;
        let choice = completion.choices.into_iter().next().ok_or(Error::EmptyResponse)?;
        let content = choice.message.content.unwrap_or_default();

        let reply = GenerationReply::from_raw(&content);
        tracing::debug!(
            request_id = request.id,
            skipped = matches!(reply, GenerationReply::Skip),
            "bridge_completion_received"
        );
        Ok(reply)
    }
}

impl BridgeGenerator for BridgeClient {
    fn generate<'a>(
        &'a self,
        request: &'a ReconstructionRequest,
    ) -> BoxFuture<'a, Result<GenerationReply, GenerationError>> {
        Box::pin(async move { self.complete(request).await.map_err(Into::into) })
    }
}
