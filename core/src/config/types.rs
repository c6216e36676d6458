use serde::{Deserialize, Serialize};

use crate::executor::{RetryPolicy, DEFAULT_WINDOW_SIZE};
use crate::remote::OperationKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_project_id")]
    pub project_id: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub policies: PolicyTable,

    #[serde(default)]
    pub autosave: AutosaveConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub prompts: PromptConfig,

    #[serde(default = "default_personas")]
    pub personas: Vec<Persona>,
}

fn default_project_id() -> String {
    "castforge".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            logging: LoggingConfig::default(),
            remote: RemoteConfig::default(),
            policies: PolicyTable::default(),
            autosave: AutosaveConfig::default(),
            batch: BatchConfig::default(),
            limits: LimitsConfig::default(),
            prompts: PromptConfig::default(),
            personas: default_personas(),
        }
    }
}

impl AppConfig {
    pub fn persona(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory`.
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "castforge_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// TTS models are only served from the alpha surface.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default)]
    pub models: ModelConfig,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_api_version() -> String {
    "v1alpha".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            api_key: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
            models: ModelConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_text_model")]
    pub text: String,

    #[serde(default = "default_speech_model")]
    pub speech: String,

    #[serde(default = "default_image_model")]
    pub image: String,
}

fn default_text_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_speech_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            text: default_text_model(),
            speech: default_speech_model(),
            image: default_image_model(),
        }
    }
}

impl ModelConfig {
    pub fn for_operation(&self, kind: OperationKind) -> &str {
        match kind {
            OperationKind::SpeechSingle | OperationKind::SpeechMulti => &self.speech,
            OperationKind::ImageGen => &self.image,
            OperationKind::Research
            | OperationKind::ScriptGen
            | OperationKind::ScriptOptimize
            | OperationKind::KeywordExtract
            | OperationKind::ImagePromptGen
            | OperationKind::CardNewsGen => &self.text,
        }
    }
}

/// Per-operation retry profiles. Any entry may be overridden from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyTable {
    #[serde(default = "default_research_policy")]
    pub research: RetryPolicy,
    #[serde(default = "RetryPolicy::single_shot")]
    pub script_gen: RetryPolicy,
    #[serde(default = "default_optimize_policy")]
    pub script_optimize: RetryPolicy,
    #[serde(default = "default_speech_single_policy")]
    pub speech_single: RetryPolicy,
    #[serde(default = "default_speech_multi_policy")]
    pub speech_multi: RetryPolicy,
    #[serde(default = "default_image_policy")]
    pub image_gen: RetryPolicy,
    #[serde(default = "RetryPolicy::single_shot")]
    pub keyword_extract: RetryPolicy,
    #[serde(default = "RetryPolicy::single_shot")]
    pub image_prompt_gen: RetryPolicy,
    #[serde(default = "default_card_news_policy")]
    pub card_news_gen: RetryPolicy,
}

fn default_research_policy() -> RetryPolicy {
    RetryPolicy::new(2, Some(90_000), 1_000)
}

fn default_optimize_policy() -> RetryPolicy {
    RetryPolicy::new(2, Some(300_000), 3_000)
}

fn default_speech_single_policy() -> RetryPolicy {
    RetryPolicy::new(3, Some(360_000), 3_000)
}

fn default_speech_multi_policy() -> RetryPolicy {
    RetryPolicy::new(3, Some(480_000), 5_000)
}

fn default_image_policy() -> RetryPolicy {
    RetryPolicy::new(3, Some(60_000), 2_000)
}

fn default_card_news_policy() -> RetryPolicy {
    RetryPolicy::new(2, Some(60_000), 3_000)
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            research: default_research_policy(),
            script_gen: RetryPolicy::single_shot(),
            script_optimize: default_optimize_policy(),
            speech_single: default_speech_single_policy(),
            speech_multi: default_speech_multi_policy(),
            image_gen: default_image_policy(),
            keyword_extract: RetryPolicy::single_shot(),
            image_prompt_gen: RetryPolicy::single_shot(),
            card_news_gen: default_card_news_policy(),
        }
    }
}

impl PolicyTable {
    pub fn for_operation(&self, kind: OperationKind) -> RetryPolicy {
        match kind {
            OperationKind::Research => self.research,
            OperationKind::ScriptGen => self.script_gen,
            OperationKind::ScriptOptimize => self.script_optimize,
            OperationKind::SpeechSingle => self.speech_single,
            OperationKind::SpeechMulti => self.speech_multi,
            OperationKind::ImageGen => self.image_gen,
            OperationKind::KeywordExtract => self.keyword_extract,
            OperationKind::ImagePromptGen => self.image_prompt_gen,
            OperationKind::CardNewsGen => self.card_news_gen,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    #[serde(default = "default_autosave_enabled")]
    pub enabled: bool,

    /// Record name inside the persistence store.
    #[serde(default = "default_autosave_key")]
    pub key: String,

    /// Quiet period after the last tracked mutation before a write.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Directory for the file-backed store and handle scratch space.
    /// Unset means `~/.castforge`.
    #[serde(default)]
    pub data_dir: Option<String>,
}

fn default_autosave_enabled() -> bool {
    true
}

fn default_autosave_key() -> String {
    "nano-creator-autosave".to_string()
}

fn default_debounce_ms() -> u64 {
    10_000
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: default_autosave_enabled(),
            key: default_autosave_key(),
            debounce_ms: default_debounce_ms(),
            data_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_image_window")]
    pub image_window: usize,

    /// Speech synthesis is heavy on the remote side; personas go one at a time.
    #[serde(default = "default_speech_window")]
    pub speech_window: usize,
}

fn default_image_window() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_speech_window() -> usize {
    1
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            image_window: default_image_window(),
            speech_window: default_speech_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_prompt_tokens")]
    pub max_prompt_tokens: usize,

    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    #[serde(default = "default_card_news_script_chars")]
    pub card_news_script_chars: usize,

    #[serde(default = "default_keyword_count")]
    pub keyword_count: usize,
}

fn default_max_prompt_tokens() -> usize {
    30_000
}

fn default_chars_per_token() -> usize {
    4
}

fn default_card_news_script_chars() -> usize {
    10_000
}

fn default_keyword_count() -> usize {
    10
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_prompt_tokens: default_max_prompt_tokens(),
            chars_per_token: default_chars_per_token(),
            card_news_script_chars: default_card_news_script_chars(),
            keyword_count: default_keyword_count(),
        }
    }
}

impl LimitsConfig {
    /// `ceil(chars / chars_per_token)`.
    pub fn estimate_tokens(&self, text: &str) -> usize {
        let chars = text.chars().count();
        chars.div_ceil(self.chars_per_token.max(1))
    }
}

/// Instruction templates prepended to each request. Opaque to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_research_prompt")]
    pub research: String,
    #[serde(default = "default_news_prompt")]
    pub news_analysis: String,
    #[serde(default = "default_script_prompt")]
    pub script: String,
    #[serde(default = "default_optimize_prompt")]
    pub optimize: String,
    #[serde(default = "default_keywords_prompt")]
    pub keywords: String,
    #[serde(default = "default_image_prompts_prompt")]
    pub image_prompts: String,
    #[serde(default = "default_card_news_prompt")]
    pub card_news: String,
}

fn default_research_prompt() -> String {
    "You are a professional sports data analyst. Objectively analyze the provided \
     information according to the topic and instructions. Produce a factual, statistical \
     report without advice, predictions or subjective opinion."
        .to_string()
}

fn default_news_prompt() -> String {
    "Use web search to find news from the two weeks before the game: player condition, \
     injuries, roster and tactical changes. Integrate the findings and mark which \
     information came from recent news."
        .to_string()
}

fn default_script_prompt() -> String {
    "Write a two-person sports analysis podcast script between Q (Analyst) and \
     지영 (Host) based on the research data below. Prefix every line with the speaker \
     name followed by a colon. Stay factual and data-driven."
        .to_string()
}

fn default_optimize_prompt() -> String {
    "You are a TTS director. Enrich the script with bracketed delivery tags such as \
     [confident], [thoughtful], [short pause] so the conversation sounds natural. Keep \
     speaker prefixes and content unchanged. Return only the optimized script."
        .to_string()
}

fn default_keywords_prompt() -> String {
    "Extract the 10 most important, visually representable keywords from the podcast \
     script. Return a JSON array of strings and nothing else."
        .to_string()
}

fn default_image_prompts_prompt() -> String {
    "Turn each keyword into one detailed image prompt: subject, photographic style, \
     lighting, composition and detail. Return a single JSON object mapping each original \
     keyword to its prompt and nothing else."
        .to_string()
}

fn default_card_news_prompt() -> String {
    "Turn the podcast script into a 10-card vertical (9:16) card news story using a \
     hook, story, offer structure. Each card has a short Korean `title`, a data-driven \
     `content` body and an English `image_prompt`. Return JSON with a `cards` array."
        .to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            research: default_research_prompt(),
            news_analysis: default_news_prompt(),
            script: default_script_prompt(),
            optimize: default_optimize_prompt(),
            keywords: default_keywords_prompt(),
            image_prompts: default_image_prompts_prompt(),
            card_news: default_card_news_prompt(),
        }
    }
}

/// A podcast voice: identity plus the prebuilt TTS voice it speaks with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub voice: String,
}

impl Persona {
    /// Speaker label used in multi-speaker scripts: first word of the display name.
    pub fn speaker_label(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

fn default_personas() -> Vec<Persona> {
    vec![
        Persona {
            id: "q".into(),
            name: "Q (Analyst)".into(),
            description: "Expert sports data analyst".into(),
            voice: "Puck".into(),
        },
        Persona {
            id: "jiyoung".into(),
            name: "지영 (Host)".into(),
            description: "Engaging podcast host".into(),
            voice: "Achernar".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_operation_table() {
        let table = PolicyTable::default();
        let research = table.for_operation(OperationKind::Research);
        assert_eq!(research, RetryPolicy::new(2, Some(90_000), 1_000));
        assert_eq!(
            table.for_operation(OperationKind::ScriptGen),
            RetryPolicy::single_shot()
        );
        assert_eq!(
            table.for_operation(OperationKind::SpeechMulti),
            RetryPolicy::new(3, Some(480_000), 5_000)
        );
        assert_eq!(
            table.for_operation(OperationKind::CardNewsGen).backoff_ms,
            3_000
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [policies.image_gen]
            max_retries = 1
            timeout_ms = 5000

            [autosave]
            debounce_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(cfg.policies.image_gen.max_retries, 1);
        assert_eq!(cfg.policies.image_gen.backoff_ms, 1_000);
        assert_eq!(cfg.policies.research.max_retries, 2);
        assert_eq!(cfg.autosave.debounce_ms, 250);
        assert_eq!(cfg.autosave.key, "nano-creator-autosave");
        assert_eq!(cfg.personas.len(), 2);
        assert_eq!(cfg.batch.image_window, 3);
    }

    #[test]
    fn token_estimate_rounds_up() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.estimate_tokens(""), 0);
        assert_eq!(limits.estimate_tokens("abcd"), 1);
        assert_eq!(limits.estimate_tokens("abcde"), 2);
    }

    #[test]
    fn speaker_label_is_first_word() {
        let cfg = AppConfig::default();
        let labels: Vec<_> = cfg.personas.iter().map(Persona::speaker_label).collect();
        assert_eq!(labels, vec!["Q", "지영"]);
        assert_eq!(cfg.persona("q").map(|p| p.voice.as_str()), Some("Puck"));
    }

    #[test]
    fn models_per_operation() {
        let models = ModelConfig::default();
        assert_eq!(models.for_operation(OperationKind::SpeechSingle), "gemini-2.5-flash-preview-tts");
        assert_eq!(models.for_operation(OperationKind::ImageGen), "gemini-2.5-flash-image");
        assert_eq!(models.for_operation(OperationKind::Research), "gemini-2.5-pro");
    }
}
