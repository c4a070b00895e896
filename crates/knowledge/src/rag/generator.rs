//! Answer generation from retrieved context via a single LLM call.

use crate::types::ScoredChunk;
use orbit_core::config::LlmSettings;
use orbit_core::{AppError, AppResult};
use orbit_llm::{LlmClient, LlmRequest};
use orbit_prompt::builtin::DEFAULT_DECLINE;
use orbit_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;

/// Produces an answer from a query and its retrieved context.
#[derive(Clone)]
pub struct Generator {
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl Generator {
    pub fn new(llm: Arc<dyn LlmClient>, prompt: PromptDefinition, settings: &LlmSettings) -> Self {
        Self {
            llm,
            prompt,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }

    /// Reply used when there is no context to answer from.
    pub fn decline_message(&self) -> &str {
        self.prompt.decline.as_deref().unwrap_or(DEFAULT_DECLINE)
    }

    /// Answer `query` from `context`. The model output is returned unmodified.
    ///
    /// Empty context yields the decline message without calling the model.
    pub async fn answer(&self, query: &str, context: &[ScoredChunk]) -> AppResult<String> {
        if context.is_empty() {
            tracing::info!("No relevant context; declining without calling the LLM");
            return Ok(self.decline_message().to_string());
        }

        let mut variables = HashMap::new();
        variables.insert("query".to_string(), query.to_string());
        variables.insert("context".to_string(), build_context(context));

        let built = build_prompt(&self.prompt, variables).map_err(|e| {
            AppError::Generation(format!("Failed to render answer prompt: {}", e))
        })?;

        let mut request =
            LlmRequest::new(built.user, self.model.as_str()).with_temperature(self.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            "Generating answer with {} (model {}, {} context chunks)",
            self.llm.provider_name(),
            self.model,
            context.len()
        );

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        if response.content.trim().is_empty() {
            return Err(AppError::Generation(format!(
                "{} returned an empty answer",
                self.llm.provider_name()
            )));
        }

        tracing::debug!(
            "Answer generated ({} prompt tokens, {} completion tokens)",
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );

        Ok(response.content)
    }
}

/// Concatenate chunks into the context block of the system message.
fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            format!(
                "[Document {}: {}, page {}]\n{}",
                i + 1,
                scored.chunk.source,
                scored.chunk.page,
                scored.chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;
    use async_trait::async_trait;
    use orbit_llm::{LlmResponse, LlmUsage};
    use std::sync::Mutex;

    /// Records requests and replies with a fixed result.
    struct RecordingClient {
        reply: Result<String, String>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl RecordingClient {
        fn replying(reply: Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(String::from).map_err(String::from),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(content) => Ok(LlmResponse {
                    content: content.clone(),
                    model: request.model.clone(),
                    usage: LlmUsage::new(10, 5),
                    finish_reason: Some("stop".to_string()),
                }),
                Err(message) => Err(AppError::Llm(message.clone())),
            }
        }
    }

    fn chunk(source: &str, page: u32, text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                text: text.to_string(),
                source: source.to_string(),
                page,
                position: 0,
                start: 0,
                end: text.chars().count(),
                hash: String::new(),
            },
            score: 0.8,
        }
    }

    fn generator(client: Arc<RecordingClient>) -> Generator {
        let prompt = orbit_prompt::builtin::answer_prompt().unwrap();
        Generator::new(client, prompt, &LlmSettings::default())
    }

    #[tokio::test]
    async fn test_empty_context_declines_without_llm_call() {
        let client = RecordingClient::replying(Ok("should not be used"));
        let answer = generator(client.clone())
            .answer("What is the capital of France?", &[])
            .await
            .unwrap();

        assert_eq!(answer, DEFAULT_DECLINE);
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_carries_persona_context_and_query() {
        let client = RecordingClient::replying(Ok("CollabCircle was founded in 2023."));
        let context = vec![
            chunk("handbook.pdf", 1, "CollabCircle was founded in 2023."),
            chunk("faq.md", 1, "Membership is free for students."),
        ];

        let answer = generator(client.clone())
            .answer("When was CollabCircle founded?", &context)
            .await
            .unwrap();
        assert_eq!(answer, "CollabCircle was founded in 2023.");

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);

        let request = &requests[0];
        assert_eq!(request.prompt, "When was CollabCircle founded?");
        assert_eq!(request.model, "gemini-flash-latest");
        assert_eq!(request.temperature, Some(0.3));

        let system = request.system.as_deref().unwrap();
        assert!(system.contains("You are Orbit"));
        assert!(system.contains("helpful, professional, and encouraging"));
        assert!(system.contains("[Document 1: handbook.pdf, page 1]"));
        assert!(system.contains("Membership is free for students."));
    }

    #[tokio::test]
    async fn test_output_is_not_modified() {
        let reply = "  **2023**, according to the handbook.\n";
        let client = RecordingClient::replying(Ok(reply));
        let answer = generator(client)
            .answer("When?", &[chunk("handbook.pdf", 1, "Founded in 2023.")])
            .await
            .unwrap();
        assert_eq!(answer, reply);
    }

    #[tokio::test]
    async fn test_llm_failure_is_generation_error() {
        let client = RecordingClient::replying(Err("quota exceeded"));
        let err = generator(client)
            .answer("When?", &[chunk("handbook.pdf", 1, "Founded in 2023.")])
            .await
            .unwrap_err();

        match err {
            AppError::Generation(msg) => assert!(msg.contains("quota exceeded")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_output_is_generation_error() {
        let client = RecordingClient::replying(Ok("   "));
        let err = generator(client)
            .answer("When?", &[chunk("handbook.pdf", 1, "Founded in 2023.")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[tokio::test]
    async fn test_broken_prompt_is_generation_error() {
        let client = RecordingClient::replying(Ok("unused"));
        let mut prompt = orbit_prompt::builtin::answer_prompt().unwrap();
        prompt.template = "{{#if query}}{{query}}".to_string();
        let generator = Generator::new(client.clone(), prompt, &LlmSettings::default());

        let err = generator
            .answer("When?", &[chunk("handbook.pdf", 1, "Founded in 2023.")])
            .await
            .unwrap_err();

        match err {
            AppError::Generation(msg) => assert!(msg.contains("answer prompt")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_build_context() {
        let context = build_context(&[
            chunk("a.md", 1, "First chunk"),
            chunk("b.pdf", 3, "Second chunk"),
        ]);
        assert!(context.contains("[Document 1: a.md, page 1]\nFirst chunk"));
        assert!(context.contains("[Document 2: b.pdf, page 3]\nSecond chunk"));
        assert!(context.contains("---"));
    }
}
