//! Typed generation operations over an abstract backend.
//!
//! Each operation sanitizes its free-text input, builds one
//! `GenerateRequest`, runs it through the retry executor with the
//! operation's policy and validates the response shape.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{AppConfig, Persona};
use crate::error::GenerationError;
use crate::executor::{OnRetry, RetryExecutor, RetryPolicy, Sleeper};
use crate::remote::parse::{parse_card_deck, parse_string_list, parse_string_map};
use crate::remote::{
    sanitize, AspectRatio, CardContent, GenerateRequest, GenerateResponse, GenerationBackend,
    GroundingSource, InlinePart, Modality, OperationKind, SpeakerVoice, VoiceConfig,
};

const RAW_DATA_FALLBACK: &str = "No raw data provided. Rely primarily on your web search capabilities.";
const TRUNCATION_MARKER: &str = "\n\n[... script truncated ...]";

/// User input for the research stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchBrief {
    pub topic: String,
    pub instructions: String,
    pub raw_data: String,
    pub analyze_news: bool,
}

impl ResearchBrief {
    /// Web search grounding is needed when there is nothing to analyze locally
    /// or when recent news was requested.
    pub fn needs_web_search(&self) -> bool {
        self.raw_data.trim().is_empty() || self.analyze_news
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchReport {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

/// One remote call: what to send and under which policy.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub kind: OperationKind,
    pub request: GenerateRequest,
    pub policy: RetryPolicy,
}

pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    executor: RetryExecutor,
    config: Arc<AppConfig>,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: Arc<AppConfig>) -> Self {
        Self {
            backend,
            executor: RetryExecutor::default(),
            config,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.executor = RetryExecutor::new(sleeper);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn task(&self, kind: OperationKind, prompt: String) -> GenerationTask {
        GenerationTask {
            kind,
            request: GenerateRequest::text(kind, self.config.remote.models.for_operation(kind), prompt),
            policy: self.config.policies.for_operation(kind),
        }
    }

    /// Run `task` and validate the response inside each attempt.
    async fn execute<T, V>(
        &self,
        task: GenerationTask,
        on_retry: OnRetry<'_>,
        validate: V,
    ) -> Result<T, GenerationError>
    where
        V: Fn(GenerateResponse) -> Result<T, GenerationError>,
    {
        let GenerationTask {
            kind,
            request,
            policy,
        } = task;
        let backend = &self.backend;
        let validate = &validate;
        let request = &request;

        tracing::debug!(
            target: "castforge.remote",
            stage = "remote.dispatch",
            operation = %kind,
            backend = %backend.name(),
            model = %request.model,
            prompt_chars = request.prompt.chars().count(),
            web_search = request.web_search
        );

        self.executor
            .run(kind.as_str(), &policy, on_retry, || async move {
                let response = backend
                    .generate(request.clone())
                    .await
                    .map_err(GenerationError::from_remote)?;
                validate(response)
            })
            .await
    }

    pub async fn research(
        &self,
        brief: &ResearchBrief,
        on_retry: OnRetry<'_>,
    ) -> Result<ResearchReport, GenerationError> {
        let prompts = &self.config.prompts;
        let raw = sanitize(&brief.raw_data);
        let news = if brief.analyze_news {
            format!("\n[ADDITIONAL INSTRUCTIONS - NEWS ANALYSIS]\n{}", prompts.news_analysis)
        } else {
            String::new()
        };
        let prompt = format!(
            "{}\n\n[TOPIC]\n{}\n\n[INSTRUCTIONS]\n{}{}\n\n[RAW DATA FOR ANALYSIS]\n```\n{}\n```",
            prompts.research,
            sanitize(&brief.topic),
            sanitize(&brief.instructions),
            news,
            if raw.trim().is_empty() { RAW_DATA_FALLBACK } else { raw.as_str() },
        );

        let mut task = self.task(OperationKind::Research, prompt);
        task.request = task.request.with_web_search(brief.needs_web_search());

        self.execute(task, on_retry, |resp| {
            let text = require_text(&resp)?;
            Ok(ResearchReport {
                text,
                sources: resp.sources,
            })
        })
        .await
    }

    /// Single-shot; refuses oversized prompts before any remote call.
    pub async fn generate_script(&self, research: &str) -> Result<String, GenerationError> {
        if research.trim().is_empty() {
            return Err(GenerationError::Precondition(
                "run research before generating a script".to_string(),
            ));
        }
        let prompt = format!(
            "{}\n\n--- RESEARCH DATA ---\n\n{}",
            self.config.prompts.script,
            sanitize(research)
        );

        let limits = &self.config.limits;
        let estimated = limits.estimate_tokens(&prompt);
        if estimated > limits.max_prompt_tokens {
            tracing::warn!(
                target: "castforge.remote",
                stage = "remote.rejected",
                operation = %OperationKind::ScriptGen,
                estimated_tokens = estimated,
                limit = limits.max_prompt_tokens
            );
            return Err(GenerationError::InputTooLarge {
                estimated,
                limit: limits.max_prompt_tokens,
            });
        }

        let task = self.task(OperationKind::ScriptGen, prompt);
        self.execute(task, &crate::executor::ignore_retries, |resp| require_text(&resp))
            .await
    }

    pub async fn optimize_script(
        &self,
        script: &str,
        on_retry: OnRetry<'_>,
    ) -> Result<String, GenerationError> {
        let prompt = format!(
            "{}\n\n--- SCRIPT TO OPTIMIZE ---\n\n{}",
            self.config.prompts.optimize,
            sanitize(script)
        );
        let task = self.task(OperationKind::ScriptOptimize, prompt);
        self.execute(task, on_retry, |resp| require_text(&resp)).await
    }

    /// Raw PCM speech for one persona.
    pub async fn synthesize_speech(
        &self,
        script: &str,
        persona: &Persona,
        on_retry: OnRetry<'_>,
    ) -> Result<InlinePart, GenerationError> {
        let mut task = self.task(OperationKind::SpeechSingle, sanitize(script));
        task.request = task
            .request
            .with_modality(Modality::Audio)
            .with_voice(VoiceConfig::Single {
                voice: persona.voice.clone(),
            });
        self.execute(task, on_retry, |resp| require_part(resp, "audio"))
            .await
    }

    /// Raw PCM for the whole multi-speaker conversation.
    pub async fn synthesize_conversation(
        &self,
        script: &str,
        personas: &[Persona],
        on_retry: OnRetry<'_>,
    ) -> Result<InlinePart, GenerationError> {
        let speakers = personas
            .iter()
            .map(|p| SpeakerVoice {
                speaker: p.speaker_label().to_string(),
                voice: p.voice.clone(),
            })
            .collect();
        let mut task = self.task(OperationKind::SpeechMulti, sanitize(script));
        task.request = task
            .request
            .with_modality(Modality::Audio)
            .with_voice(VoiceConfig::Multi { speakers });
        self.execute(task, on_retry, |resp| require_part(resp, "audio"))
            .await
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
        aspect: AspectRatio,
        on_retry: OnRetry<'_>,
    ) -> Result<InlinePart, GenerationError> {
        let prompt = format!("{}, {} aspect ratio", sanitize(prompt), aspect.as_str());
        let mut task = self.task(OperationKind::ImageGen, prompt);
        task.request = task.request.with_modality(Modality::Image);
        self.execute(task, on_retry, |resp| require_part(resp, "image"))
            .await
    }

    /// Exactly `limits.keyword_count` keywords. Repeats the model returned
    /// are dropped (case-insensitive) and extra entries are cut. Only a list
    /// still short after that is padded by cycling, which is the one case
    /// that yields repeated keywords and therefore repeated B-roll prompts.
    pub async fn extract_keywords(&self, script: &str) -> Result<Vec<String>, GenerationError> {
        let prompt = format!(
            "{}\n\n--- SCRIPT ---\n{}",
            self.config.prompts.keywords,
            sanitize(script)
        );
        let task = self.task(OperationKind::KeywordExtract, prompt);
        let wanted = self.config.limits.keyword_count;
        self.execute(task, &crate::executor::ignore_retries, |resp| {
            let text = require_text(&resp)?;
            let keywords: Vec<String> = parse_string_list(&text)?
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            fit_keywords(keywords, wanted)
        })
        .await
    }

    /// Keyword → image prompt, in keyword order. A keyword the model skipped
    /// is used as its own prompt.
    pub async fn generate_image_prompts(
        &self,
        keywords: &[String],
    ) -> Result<Vec<(String, String)>, GenerationError> {
        let clean: Vec<String> = keywords.iter().map(|k| sanitize(k)).collect();
        let encoded = serde_json::to_string(&clean)
            .map_err(|e| GenerationError::Unknown(format!("encode keywords: {e}")))?;
        let prompt = format!(
            "{}\n\n--- Input Keywords ---\n{}",
            self.config.prompts.image_prompts, encoded
        );
        let mut task = self.task(OperationKind::ImagePromptGen, prompt);
        task.request = task.request.with_json();

        self.execute(task, &crate::executor::ignore_retries, |resp| {
            let text = require_text(&resp)?;
            let map = parse_string_map(&text)?;
            Ok(keywords
                .iter()
                .zip(&clean)
                .map(|(original, cleaned)| {
                    let prompt = map
                        .iter()
                        .find(|(k, _)| k == original || k == cleaned)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_else(|| original.clone());
                    (original.clone(), prompt)
                })
                .collect())
        })
        .await
    }

    pub async fn generate_card_news(
        &self,
        script: &str,
        on_retry: OnRetry<'_>,
    ) -> Result<Vec<CardContent>, GenerationError> {
        let capped = cap_chars(script, self.config.limits.card_news_script_chars);
        let prompt = format!(
            "{}\n\n--- PODCAST SCRIPT ---\n{}",
            self.config.prompts.card_news,
            sanitize(&capped)
        );
        let mut task = self.task(OperationKind::CardNewsGen, prompt);
        task.request = task.request.with_json();
        self.execute(task, on_retry, |resp| {
            let text = require_text(&resp)?;
            parse_card_deck(&text)
        })
        .await
    }
}

fn require_text(resp: &GenerateResponse) -> Result<String, GenerationError> {
    match resp.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(GenerationError::Parse("response contained no text".to_string())),
    }
}

fn require_part(resp: GenerateResponse, what: &str) -> Result<InlinePart, GenerationError> {
    resp.parts
        .into_iter()
        .find(|p| !p.data.is_empty())
        .ok_or_else(|| GenerationError::Parse(format!("no {what} data in response")))
}

fn fit_keywords(keywords: Vec<String>, wanted: usize) -> Result<Vec<String>, GenerationError> {
    if keywords.is_empty() {
        return Err(GenerationError::Parse("no keywords in response".to_string()));
    }
    let mut seen = HashSet::new();
    let distinct: Vec<String> = keywords
        .into_iter()
        .filter(|k| seen.insert(k.to_lowercase()))
        .take(wanted)
        .collect();
    if distinct.len() < wanted {
        tracing::debug!(
            target: "castforge.client",
            stage = "keywords.padded",
            distinct = distinct.len(),
            wanted
        );
    }
    Ok(distinct.iter().cycle().take(wanted).cloned().collect())
}

fn cap_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_padded_by_cycling() {
        let kws = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let out = fit_keywords(kws, 10).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out[..4], ["a", "b", "c", "a"]);
    }

    #[test]
    fn repeated_keywords_are_dropped_before_truncating() {
        let kws: Vec<String> = ["dunk", "Dunk", "rebound", "dunk", "rebound"]
            .into_iter()
            .map(String::from)
            .chain((0..10).map(|i| format!("k{i}")))
            .collect();
        let out = fit_keywords(kws, 10).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out[..3], ["dunk", "rebound", "k0"]);
        assert_eq!(out[9], "k7");
        let unique: HashSet<_> = out.iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn keywords_are_truncated() {
        let kws: Vec<String> = (0..14).map(|i| format!("k{i}")).collect();
        let out = fit_keywords(kws, 10).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out[9], "k9");
    }

    #[test]
    fn no_keywords_is_parse_error() {
        assert!(matches!(
            fit_keywords(Vec::new(), 10),
            Err(GenerationError::Parse(_))
        ));
    }

    #[test]
    fn cap_respects_char_boundaries() {
        assert_eq!(cap_chars("short", 10), "short");
        let capped = cap_chars("가나다라마", 3);
        assert!(capped.starts_with("가나다"));
        assert!(capped.ends_with("[... script truncated ...]"));
        assert!(!capped.contains('라'));
    }

    #[test]
    fn web_search_rule() {
        let mut brief = ResearchBrief {
            topic: "derby".into(),
            raw_data: "table".into(),
            ..ResearchBrief::default()
        };
        assert!(!brief.needs_web_search());
        brief.analyze_news = true;
        assert!(brief.needs_web_search());
        brief.analyze_news = false;
        brief.raw_data = "   ".into();
        assert!(brief.needs_web_search());
    }
}
