//! Question answering and summarisation over the stored documents.
//!
//! Builds a context prompt from every stored document, then either delegates
//! to the configured provider or, when no provider is configured, falls back
//! to canned responses chosen by keyword. Provider failures never escape:
//! [`Orchestrator::answer`] turns them into [`APOLOGY`] and
//! [`Orchestrator::summarize`] into [`SUMMARY_UNAVAILABLE`].

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::config::ProvidersConfig;
use crate::error::{Error, Result};
use crate::models::ProviderConfig;
use crate::provider::adapter_for;
use crate::store::DocumentStore;
use crate::transport::Transport;

pub const APOLOGY: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";

pub const SUMMARY_UNAVAILABLE: &str = "Unable to generate AI summary. Please check your API configuration and ensure your API key is valid.";

pub const NO_DOCUMENTS: &str = "I'd be happy to help! Please upload a document first so I can analyze its content and answer your questions.";

/// Characters of a document sent to the provider for summarisation.
pub const SUMMARY_CONTENT_LIMIT: usize = 4000;

const SUMMARY_RESPONSE: &str = "Based on the uploaded documents, here's a summary: The documents contain valuable information across multiple topics. Key themes include strategic planning, technical implementation, and data analysis. Would you like me to focus on any specific aspect?";

const KEY_POINTS_RESPONSE: &str = "Here are the key points from your documents:\n• Strategic objectives and implementation roadmap\n• Technical specifications and requirements\n• Data insights and analytical findings\n• Recommendations for next steps";

const QUESTION_RESPONSE: &str = "Great question! Based on the document content, I can provide detailed insights. The information suggests multiple approaches to consider. Would you like me to elaborate on any specific section?";

const SEARCH_RESPONSE: &str = "I can help you search through your documents. Use the search command to find specific information, or ask me about particular topics you're looking for.";

pub const DEFAULT_RESPONSES: [&str; 4] = [
    "That's an interesting point about your document. Based on the content I've analyzed, there are several relevant aspects to consider. Would you like me to dive deeper into any specific area?",
    "I understand your question about the document content. The information suggests multiple perspectives on this topic. Let me know if you'd like me to focus on particular sections.",
    "Good question! The documents contain relevant information about this topic. I can provide more detailed analysis if you specify which aspect interests you most.",
    "Based on my analysis of your uploaded documents, I can see connections to your query. Would you like me to highlight specific sections or provide a broader overview?",
];

pub const CANNED_SUMMARIES: [&str; 4] = [
    "This document contains important information about project requirements and specifications. Key topics include implementation guidelines, technical architecture, and delivery timelines.",
    "The document outlines strategic business objectives and market analysis. It covers competitive landscape, target demographics, and growth opportunities.",
    "This file contains technical documentation with code examples, API references, and best practices for development teams.",
    "The document presents research findings and data analysis with statistical insights, trends, and recommendations for future actions.",
];

/// Every response the unconfigured fallback can produce.
pub fn canned_responses() -> impl Iterator<Item = &'static str> {
    [
        NO_DOCUMENTS,
        SUMMARY_RESPONSE,
        KEY_POINTS_RESPONSE,
        QUESTION_RESPONSE,
        SEARCH_RESPONSE,
    ]
    .into_iter()
    .chain(DEFAULT_RESPONSES)
}

/// Context block + question + instruction to admit when the documents don't
/// answer it.
pub fn build_prompt(question: &str, store: &DocumentStore) -> String {
    let mut prompt = String::new();
    if !store.is_empty() {
        let context = store
            .all_entries()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n\n");
        prompt.push_str("Context from uploaded documents:\n\n");
        prompt.push_str(&context);
        prompt.push_str("\n\n");
    }
    prompt.push_str("User Question: ");
    prompt.push_str(question);
    prompt.push_str("\n\nPlease provide a detailed answer based on the document content above. If the question cannot be answered using the provided documents, please state that clearly.");
    prompt
}

pub fn build_summary_prompt(text: &str, id: &str) -> String {
    let content: String = text.chars().take(SUMMARY_CONTENT_LIMIT).collect();
    format!(
        "Please analyze this document and provide a concise summary highlighting the key points, main topics, and important insights. \n\n\
         Document: \"{id}\"\n\n\
         Content: {content}\n\n\
         Please provide:\n\
         1. A brief summary of the document\n\
         2. Key points and main topics\n\
         3. Important insights or conclusions\n\
         4. Any actionable items or recommendations"
    )
}

/// Keyword-matched stand-in for a provider answer.
pub fn canned_response(question: &str, store: &DocumentStore) -> &'static str {
    if store.is_empty() {
        return NO_DOCUMENTS;
    }
    let q = question.to_lowercase();
    if q.contains("summary") || q.contains("summarize") {
        SUMMARY_RESPONSE
    } else if q.contains("key points") || q.contains("main points") {
        KEY_POINTS_RESPONSE
    } else if q.contains("question") || q.contains('?') {
        QUESTION_RESPONSE
    } else if q.contains("search") || q.contains("find") {
        SEARCH_RESPONSE
    } else {
        pick(&DEFAULT_RESPONSES)
    }
}

fn pick(pool: &[&'static str]) -> &'static str {
    pool.choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(pool[0])
}

pub struct Orchestrator<'a> {
    transport: &'a dyn Transport,
    endpoints: &'a ProvidersConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(transport: &'a dyn Transport, endpoints: &'a ProvidersConfig) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Answer a question. Never fails; provider errors become [`APOLOGY`].
    pub async fn answer(
        &self,
        question: &str,
        store: &DocumentStore,
        config: &ProviderConfig,
    ) -> String {
        match self.try_answer(question, store, config).await {
            Ok(text) => text,
            Err(e) => {
                warn!(provider = %config.provider, error = %e, "answer failed");
                APOLOGY.to_string()
            }
        }
    }

    /// Like [`answer`](Self::answer) but exposes the provider error so the
    /// caller can notify the operator separately.
    pub async fn try_answer(
        &self,
        question: &str,
        store: &DocumentStore,
        config: &ProviderConfig,
    ) -> Result<String> {
        if !config.is_ready() {
            return Ok(canned_response(question, store).to_string());
        }
        let prompt = build_prompt(question, store);
        self.complete(config, &prompt).await
    }

    /// Summarise one document. Never fails; provider errors become
    /// [`SUMMARY_UNAVAILABLE`].
    pub async fn summarize(&self, text: &str, id: &str, config: &ProviderConfig) -> String {
        if !config.is_ready() {
            return pick(&CANNED_SUMMARIES).to_string();
        }
        match self.complete(config, &build_summary_prompt(text, id)).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(document = id, error = %e, "summary failed");
                SUMMARY_UNAVAILABLE.to_string()
            }
        }
    }

    async fn complete(&self, config: &ProviderConfig, prompt: &str) -> Result<String> {
        if !config.is_ready() {
            return Err(Error::NotConfigured);
        }
        let adapter = adapter_for(config.provider, self.endpoints);
        let request = adapter.build_request(config, prompt);
        debug!(
            provider = %config.provider,
            model = %config.model,
            prompt_chars = prompt.len(),
            "calling provider"
        );
        let body = self.transport.post(&request).await?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| {
                Error::response_format(config.provider.as_str(), format!("invalid JSON: {}", e))
            })?;
        adapter.parse_response(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use crate::transport::mock::MockTransport;

    fn store() -> DocumentStore {
        let mut store = DocumentStore::new();
        store
            .put("q.txt", "The quarterly revenue grew by 12%.")
            .unwrap();
        store.put("n.md", "Headcount is flat.").unwrap();
        store.put_summary("q.txt", "SUMMARY-ONLY-TEXT");
        store
    }

    fn openai() -> ProviderConfig {
        ProviderConfig {
            provider: Provider::OpenAI,
            api_key: "sk-test".to_string(),
            model: "gpt-4".to_string(),
            configured: true,
        }
    }

    #[test]
    fn prompt_concatenates_documents_in_order_without_summaries() {
        let prompt = build_prompt("what grew?", &store());
        assert!(prompt.starts_with(
            "Context from uploaded documents:\n\nThe quarterly revenue grew by 12%.\n\nHeadcount is flat.\n\n"
        ));
        assert!(prompt.contains("User Question: what grew?"));
        assert!(prompt.contains("please state that clearly"));
        assert!(!prompt.contains("SUMMARY-ONLY-TEXT"));
    }

    #[test]
    fn empty_store_prompt_has_no_context_block() {
        let prompt = build_prompt("hello", &DocumentStore::new());
        assert!(prompt.starts_with("User Question: hello"));
    }

    #[test]
    fn summary_prompt_truncates_content() {
        let long = "x".repeat(SUMMARY_CONTENT_LIMIT + 500);
        let prompt = build_summary_prompt(&long, "big.txt");
        assert!(prompt.contains("Document: \"big.txt\""));
        assert!(prompt.contains(&"x".repeat(SUMMARY_CONTENT_LIMIT)));
        assert!(!prompt.contains(&"x".repeat(SUMMARY_CONTENT_LIMIT + 1)));
        assert!(prompt.contains("4. Any actionable items or recommendations"));
    }

    #[test]
    fn canned_responses_follow_keywords() {
        let store = store();
        assert_eq!(canned_response("Please SUMMARIZE this", &store), SUMMARY_RESPONSE);
        assert_eq!(canned_response("list the main points", &store), KEY_POINTS_RESPONSE);
        assert_eq!(canned_response("what was the revenue growth?", &store), QUESTION_RESPONSE);
        assert_eq!(canned_response("find the budget", &store), SEARCH_RESPONSE);
        assert!(DEFAULT_RESPONSES.contains(&canned_response("tell me more", &store)));
        assert_eq!(canned_response("anything", &DocumentStore::new()), NO_DOCUMENTS);
    }

    #[tokio::test]
    async fn unconfigured_answer_is_canned_and_skips_transport() {
        let transport = MockTransport::replying("{}");
        let endpoints = ProvidersConfig::default();
        let orchestrator = Orchestrator::new(&transport, &endpoints);
        let answer = orchestrator
            .answer("what was the revenue growth?", &store(), &ProviderConfig::default())
            .await;
        assert!(canned_responses().any(|c| c == answer));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn configured_answer_uses_provider() {
        let transport =
            MockTransport::replying(r#"{"choices":[{"message":{"content":"Revenue grew 12%."}}]}"#);
        let endpoints = ProvidersConfig::default();
        let orchestrator = Orchestrator::new(&transport, &endpoints);
        let answer = orchestrator.answer("growth?", &store(), &openai()).await;
        assert_eq!(answer, "Revenue grew 12%.");

        let body = transport.last_body().unwrap();
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("The quarterly revenue grew by 12%."));
        assert!(user.contains("User Question: growth?"));
    }

    #[tokio::test]
    async fn provider_failure_becomes_apology() {
        let transport = MockTransport::failing("HTTP 500: boom");
        let endpoints = ProvidersConfig::default();
        let orchestrator = Orchestrator::new(&transport, &endpoints);
        assert_eq!(orchestrator.answer("q", &store(), &openai()).await, APOLOGY);

        let err = orchestrator.try_answer("q", &store(), &openai()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn malformed_reply_becomes_apology() {
        let transport = MockTransport::replying(r#"{"unexpected":true}"#);
        let endpoints = ProvidersConfig::default();
        let orchestrator = Orchestrator::new(&transport, &endpoints);
        assert_eq!(orchestrator.answer("q", &store(), &openai()).await, APOLOGY);
    }

    #[tokio::test]
    async fn summarize_falls_back_on_failure() {
        let transport = MockTransport::failing("connection refused");
        let endpoints = ProvidersConfig::default();
        let orchestrator = Orchestrator::new(&transport, &endpoints);
        let summary = orchestrator.summarize("text", "a.txt", &openai()).await;
        assert_eq!(summary, SUMMARY_UNAVAILABLE);
    }

    #[tokio::test]
    async fn summarize_without_provider_uses_canned_pool() {
        let transport = MockTransport::replying("{}");
        let endpoints = ProvidersConfig::default();
        let orchestrator = Orchestrator::new(&transport, &endpoints);
        let summary = orchestrator
            .summarize("text", "a.txt", &ProviderConfig::default())
            .await;
        assert!(CANNED_SUMMARIES.contains(&summary.as_str()));
        assert_eq!(transport.calls(), 0);
    }
}
