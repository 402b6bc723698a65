//! RAG response generation.

use super::context::{format_context_for_prompt, recent_history};
use super::{ContextBuilder, Source};
use crate::config::{Prompts, RagSettings, Settings};
use crate::error::{AdvisorError, Result};
use crate::generation::{create_generator, ChatMessage, Generator};
use crate::indexer::KnowledgeBase;
use crate::retry::RetryPolicy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Response from a RAG query or a chat turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagResponse {
    /// Answer shown to the user.
    pub answer: String,
    /// Records used as context, closest first. Empty for persona chat.
    pub sources: Vec<Source>,
    /// Whether `answer` is the apology returned after the backend failed.
    pub fallback: bool,
}

/// Text after the last occurrence of `marker`, trimmed.
///
/// Text-completion models often echo the prompt, so everything up to the
/// final marker is discarded. Without a marker the whole text is kept.
pub fn extract_answer(text: &str, marker: &str) -> String {
    if marker.is_empty() {
        return text.trim().to_string();
    }
    text.rsplit(marker).next().unwrap_or(text).trim().to_string()
}

/// Generation with bounded retry, answer extraction and the fallback apology.
struct Completion<'a> {
    generator: &'a dyn Generator,
    retry: RetryPolicy,
    fallback_message: &'a str,
}

impl Completion<'_> {
    /// Returns the answer and whether it is the fallback.
    ///
    /// Authentication errors are returned to the caller. Every other failure
    /// is logged and replaced by the fallback message.
    async fn complete(&self, messages: &[ChatMessage], marker: &str) -> Result<(String, bool)> {
        let generator = self.generator;
        let result = self
            .retry
            .run("Generation", || generator.generate(messages))
            .await;

        match result {
            Ok(text) => {
                debug!("Generated {} chars with {}", text.len(), generator.model());
                Ok((extract_answer(&text, marker), false))
            }
            Err(e @ AdvisorError::Authentication(_)) => Err(e),
            Err(e) => Ok(self.fallback(&e)),
        }
    }

    fn fallback(&self, error: &AdvisorError) -> (String, bool) {
        warn!("Returning fallback response: {}", error);
        (self.fallback_message.to_string(), true)
    }
}

fn validate(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(AdvisorError::InvalidQuery("Question must not be empty".to_string()));
    }
    Ok(())
}

/// Answers questions from the indexed advisor records.
///
/// Holds no conversation state: the same query and history always produce
/// the same prompt.
pub struct Responder {
    context_builder: ContextBuilder,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    settings: RagSettings,
    retry: RetryPolicy,
}

impl Responder {
    /// Create a responder with default prompts, settings and no retries.
    pub fn new(knowledge_base: Arc<KnowledgeBase>, generator: Arc<dyn Generator>) -> Self {
        let settings = RagSettings::default();
        Self {
            context_builder: ContextBuilder::new(knowledge_base).with_top_k(settings.top_k),
            generator,
            prompts: Prompts::default(),
            settings,
            retry: RetryPolicy::none(),
        }
    }

    /// Create a responder from configuration.
    pub fn from_settings(knowledge_base: Arc<KnowledgeBase>, settings: &Settings) -> Result<Self> {
        let generator = create_generator(&settings.generation)?;
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Ok(Self::new(knowledge_base, generator)
            .with_prompts(prompts)
            .with_settings(settings.rag.clone())
            .with_retry(RetryPolicy::from_settings(&settings.retry)))
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_settings(mut self, settings: RagSettings) -> Self {
        self.context_builder = self.context_builder.with_top_k(settings.top_k);
        self.settings = settings;
        self
    }

    /// Retry policy shared by query embedding and generation.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.context_builder = self.context_builder.with_retry(retry);
        self.retry = retry;
        self
    }

    /// Greeting shown when a chat session starts.
    pub fn welcome(&self) -> String {
        self.prompts.welcome()
    }

    /// Records closest to the query, without generating an answer.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Source>> {
        validate(query)?;
        self.context_builder.build(query).await
    }

    /// Answer a question using the closest advisor records as context.
    ///
    /// Fails only for an empty query or rejected credentials. Backend
    /// failures that survive the retry budget produce the fallback message
    /// with `fallback` set.
    #[instrument(skip(self, history), fields(query = %query))]
    pub async fn answer(&self, query: &str, history: &[ChatMessage]) -> Result<RagResponse> {
        validate(query)?;
        info!("Processing question: {}", query);

        let completion = Completion {
            generator: self.generator.as_ref(),
            retry: self.retry,
            fallback_message: &self.settings.fallback_message,
        };

        let sources = match self.context_builder.build(query).await {
            Ok(sources) => sources,
            Err(e @ AdvisorError::Authentication(_)) => return Err(e),
            Err(e) => {
                let (answer, fallback) = completion.fallback(&e);
                return Ok(RagResponse {
                    answer,
                    sources: Vec::new(),
                    fallback,
                });
            }
        };

        let mut messages = recent_history(history, self.settings.history_window);
        messages.push(ChatMessage::user(self.render_prompt(query, &sources)));

        let (answer, fallback) = completion
            .complete(&messages, &self.prompts.rag.answer_marker)
            .await?;

        debug!("Answered with {} sources", sources.len());
        Ok(RagResponse {
            answer,
            sources,
            fallback,
        })
    }

    /// The query and records are inserted in a single final pass, so any
    /// `{{...}}` they contain reaches the model as written.
    fn render_prompt(&self, query: &str, sources: &[Source]) -> String {
        let instruction = self
            .prompts
            .render_with_custom(&self.prompts.rag.instruction, &HashMap::new());

        let mut vars = HashMap::new();
        vars.insert("instruction".to_string(), instruction);
        vars.insert("context".to_string(), format_context_for_prompt(sources));
        vars.insert("question".to_string(), query.to_string());

        self.prompts.render_with_custom(&self.prompts.rag.user, &vars)
    }
}

/// Persona chat without retrieval.
pub struct Conversation {
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    settings: RagSettings,
    retry: RetryPolicy,
}

impl Conversation {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            prompts: Prompts::default(),
            settings: RagSettings::default(),
            retry: RetryPolicy::none(),
        }
    }

    /// Create a conversation from configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let generator = create_generator(&settings.generation)?;
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Ok(Self::new(generator)
            .with_prompts(prompts)
            .with_settings(settings.rag.clone())
            .with_retry(RetryPolicy::from_settings(&settings.retry)))
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_settings(mut self, settings: RagSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Greeting shown when a chat session starts.
    pub fn welcome(&self) -> String {
        self.prompts.welcome()
    }

    /// Reply to `message` given the prior turns.
    #[instrument(skip(self, history), fields(message = %message))]
    pub async fn reply(&self, message: &str, history: &[ChatMessage]) -> Result<RagResponse> {
        validate(message)?;

        let mut messages = vec![ChatMessage::system(self.prompts.persona_system())];
        messages.extend(recent_history(history, self.settings.history_window));
        messages.push(ChatMessage::user(message));

        let completion = Completion {
            generator: self.generator.as_ref(),
            retry: self.retry,
            fallback_message: &self.settings.fallback_message,
        };
        let (answer, fallback) = completion
            .complete(&messages, &self.prompts.persona.answer_marker)
            .await?;

        Ok(RagResponse {
            answer,
            sources: Vec::new(),
            fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DistanceMetric, DEFAULT_FALLBACK_MESSAGE};
    use crate::corpus::{Corpus, Record};
    use crate::indexer::tests::{faculty, keyword_embedder};
    use crate::indexer::CorpusIndexer;
    use crate::retry::Backoff;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Generator that records every request and fails a set number of times.
    struct ScriptedGenerator {
        reply: String,
        fail_first: usize,
        failure: fn() -> AdvisorError,
        calls: AtomicUsize,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedGenerator {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                fail_first: 0,
                failure: || AdvisorError::GenerationBackend("503 Service Unavailable".into()),
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing_first(mut self, n: usize) -> Self {
            self.fail_first = n;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> Vec<ChatMessage> {
            self.requests.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(messages.to_vec());
            if call < self.fail_first {
                return Err((self.failure)());
            }
            Ok(self.reply.clone())
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Backoff::Fixed(Duration::ZERO))
    }

    async fn knowledge_base(corpus: Corpus) -> Arc<KnowledgeBase> {
        let indexer = CorpusIndexer::new(Arc::new(keyword_embedder()), DistanceMetric::L2);
        Arc::new(indexer.build(corpus).await.unwrap())
    }

    fn settings(top_k: usize) -> RagSettings {
        RagSettings {
            top_k,
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_answer_uses_last_marker() {
        assert_eq!(extract_answer("Q\nAnswer: a\nAnswer:  Dr. Zhuang \n", "Answer:"), "Dr. Zhuang");
        assert_eq!(extract_answer("  plain reply ", "Answer:"), "plain reply");
        assert_eq!(extract_answer("Answer:", "Answer:"), "");
        assert_eq!(extract_answer(" x ", ""), "x");
    }

    #[tokio::test]
    async fn test_single_record_prompt_contains_question_and_context() {
        let corpus = Corpus::from_records(vec![Record::new(
            "Jun Zhuang",
            "AI, ML",
            "works on human-centered computing",
        )]);
        let generator = Arc::new(ScriptedGenerator::replying(
            "Context: ...\nAnswer: Dr. Jun Zhuang works on machine learning.",
        ));
        let responder = Responder::new(knowledge_base(corpus).await, generator.clone())
            .with_settings(settings(1));

        let query = "Who does machine learning?";
        let response = responder.answer(query, &[]).await.unwrap();

        assert!(!response.fallback);
        assert_eq!(response.answer, "Dr. Jun Zhuang works on machine learning.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].name, "Jun Zhuang");

        let request = generator.last_request();
        let prompt = &request.last().unwrap().content;
        assert!(prompt.contains(query));
        assert!(prompt.contains("Zhuang"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[tokio::test]
    async fn test_query_with_placeholders_is_kept_verbatim() {
        let generator = Arc::new(ScriptedGenerator::replying("Answer: ok"));
        let responder = Responder::new(knowledge_base(faculty()).await, generator.clone());

        let query = "What does {{context}} mean for {{university}} and {{question}}?";
        responder.answer(query, &[]).await.unwrap();

        let prompt = generator.last_request().last().unwrap().content.clone();
        assert!(prompt.contains(&format!("Question: {}\nAnswer:", query)));
        assert_eq!(prompt.matches("Context:").count(), 1);
        assert!(prompt.starts_with("You are an academic advisor AI."));
    }

    #[tokio::test]
    async fn test_recovers_after_two_transient_failures() {
        let generator =
            Arc::new(ScriptedGenerator::replying("Answer: Grace Hopper").failing_first(2));
        let responder = Responder::new(knowledge_base(faculty()).await, generator.clone())
            .with_retry(instant(3));

        let response = responder.answer("Who teaches compilers?", &[]).await.unwrap();

        assert_eq!(response.answer, "Grace Hopper");
        assert!(!response.fallback);
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_fallback() {
        let generator = Arc::new(ScriptedGenerator::replying("unused").failing_first(usize::MAX));
        let responder = Responder::new(knowledge_base(faculty()).await, generator.clone())
            .with_retry(instant(3));

        let response = responder.answer("Who teaches compilers?", &[]).await.unwrap();

        assert_eq!(response.answer, DEFAULT_FALLBACK_MESSAGE);
        assert!(response.fallback);
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_malformed_response_is_not_retried() {
        let mut scripted = ScriptedGenerator::replying("unused").failing_first(usize::MAX);
        scripted.failure = || AdvisorError::MalformedResponse("no generated_text".into());
        let generator = Arc::new(scripted);
        let responder = Responder::new(knowledge_base(faculty()).await, generator.clone())
            .with_retry(instant(3));

        let response = responder.answer("Who teaches compilers?", &[]).await.unwrap();

        assert!(response.fallback);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_query_makes_no_calls() {
        let generator = Arc::new(ScriptedGenerator::replying("Answer: x"));
        let responder = Responder::new(knowledge_base(faculty()).await, generator.clone());

        for query in ["", "   \n\t"] {
            let result = responder.answer(query, &[]).await;
            assert!(matches!(result, Err(AdvisorError::InvalidQuery(_))));
        }
        assert!(matches!(
            responder.retrieve("").await,
            Err(AdvisorError::InvalidQuery(_))
        ));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_authentication_error_propagates() {
        let mut scripted = ScriptedGenerator::replying("unused").failing_first(usize::MAX);
        scripted.failure = || AdvisorError::Authentication("Invalid API Key".into());
        let generator = Arc::new(scripted);
        let responder = Responder::new(knowledge_base(faculty()).await, generator.clone())
            .with_retry(instant(3));

        let result = responder.answer("Who teaches compilers?", &[]).await;

        assert!(matches!(result, Err(AdvisorError::Authentication(_))));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_same_input_same_answer() {
        let generator = Arc::new(ScriptedGenerator::replying("Answer: Ada Lovelace"));
        let responder = Responder::new(knowledge_base(faculty()).await, generator.clone());

        let first = responder.answer("Who works on storage?", &[]).await.unwrap();
        let first_prompt = generator.last_request();
        let second = responder.answer("Who works on storage?", &[]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first_prompt, generator.last_request());
        assert_eq!(first.sources[0].name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_top_k_beyond_corpus_uses_every_record() {
        let generator = Arc::new(ScriptedGenerator::replying("Answer: all of them"));
        let responder = Responder::new(knowledge_base(faculty()).await, generator.clone())
            .with_settings(settings(10));

        let response = responder.answer("Who is available?", &[]).await.unwrap();
        assert_eq!(response.sources.len(), 3);

        let prompt = generator.last_request().last().unwrap().content.clone();
        for name in ["Jun Zhuang", "Ada Lovelace", "Grace Hopper"] {
            assert!(prompt.contains(name));
        }
    }

    #[tokio::test]
    async fn test_history_is_windowed() {
        let generator = Arc::new(ScriptedGenerator::replying("Answer: ok"));
        let responder = Responder::new(knowledge_base(faculty()).await, generator.clone())
            .with_settings(RagSettings {
                history_window: 2,
                ..Default::default()
            });

        let history = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("second"),
            ChatMessage::user("third"),
            ChatMessage::assistant("fourth"),
        ];
        responder.answer("And databases?", &history).await.unwrap();

        let request = generator.last_request();
        assert_eq!(request.len(), 3);
        assert_eq!(request[0].content, "third");
        assert_eq!(request[1].content, "fourth");
    }

    #[tokio::test]
    async fn test_conversation_uses_persona_and_marker() {
        let generator = Arc::new(ScriptedGenerator::replying(
            "Student: hi\nAdvisor: Welcome to BSU! Advisor: How can I help?",
        ));
        let conversation = Conversation::new(generator.clone()).with_settings(RagSettings {
            history_window: 1,
            ..Default::default()
        });

        let history = vec![ChatMessage::user("old"), ChatMessage::assistant("recent")];
        let response = conversation.reply("hello", &history).await.unwrap();

        assert_eq!(response.answer, "How can I help?");
        assert!(response.sources.is_empty());

        let request = generator.last_request();
        assert_eq!(request.len(), 3);
        assert!(request[0].content.contains("BSU Graduate Advisor"));
        assert_eq!(request[1].content, "recent");
        assert_eq!(request[2], ChatMessage::user("hello"));
    }

    #[tokio::test]
    async fn test_conversation_fallback_after_retries() {
        let generator = Arc::new(ScriptedGenerator::replying("unused").failing_first(usize::MAX));
        let conversation = Conversation::new(generator.clone()).with_retry(instant(2));

        let response = conversation.reply("hello", &[]).await.unwrap();
        assert_eq!(response.answer, DEFAULT_FALLBACK_MESSAGE);
        assert!(response.fallback);
        assert_eq!(generator.calls(), 2);
        assert!(conversation.welcome().starts_with("Hi!"));
    }
}
