use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kind of remote generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Research,
    ScriptGen,
    ScriptOptimize,
    SpeechSingle,
    SpeechMulti,
    ImageGen,
    KeywordExtract,
    ImagePromptGen,
    CardNewsGen,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::ScriptGen => "script_gen",
            Self::ScriptOptimize => "script_optimize",
            Self::SpeechSingle => "speech_single",
            Self::SpeechMulti => "speech_multi",
            Self::ImageGen => "image_gen",
            Self::KeywordExtract => "keyword_extract",
            Self::ImagePromptGen => "image_prompt_gen",
            Self::CardNewsGen => "card_news_gen",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modality {
    #[default]
    Text,
    Audio,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Landscape,
    Portrait,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerVoice {
    pub speaker: String,
    pub voice: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceConfig {
    Single { voice: String },
    Multi { speakers: Vec<SpeakerVoice> },
}

/// One request to the generation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub operation: OperationKind,
    pub model: String,
    pub prompt: String,
    pub modality: Modality,
    pub voice: Option<VoiceConfig>,
    /// Ask the model for `application/json` output.
    pub json_response: bool,
    /// Enable grounding through web search.
    pub web_search: bool,
}

impl GenerateRequest {
    pub fn text(operation: OperationKind, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            operation,
            model: model.into(),
            prompt: prompt.into(),
            modality: Modality::Text,
            voice: None,
            json_response: false,
            web_search: false,
        }
    }

    pub fn with_json(mut self) -> Self {
        self.json_response = true;
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub fn with_modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    pub fn with_voice(mut self, voice: VoiceConfig) -> Self {
        self.voice = Some(voice);
        self
    }
}

/// Inline binary payload returned by the model (already decoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    pub text: Option<String>,
    pub parts: Vec<InlinePart>,
    pub sources: Vec<GroundingSource>,
}

impl GenerateResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn from_part(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            parts: vec![InlinePart {
                mime_type: mime_type.into(),
                data,
            }],
            ..Self::default()
        }
    }

    /// First inline part that carries data.
    pub fn first_part(&self) -> Option<&InlinePart> {
        self.parts.iter().find(|p| !p.data.is_empty())
    }
}

/// Failure observed at the remote boundary, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteFailure {
    /// Non-success HTTP-like status.
    Status { status: u16, message: String },
    /// The request never produced a response.
    Transport { message: String, timed_out: bool },
    /// The envelope could not be decoded.
    Decode { message: String },
}

impl RemoteFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Status { message, .. }
            | Self::Transport { message, .. }
            | Self::Decode { message } => message,
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, message } => write!(f, "status={} {}", status, message),
            Self::Transport { message, .. } => write!(f, "transport: {}", message),
            Self::Decode { message } => write!(f, "decode: {}", message),
        }
    }
}

/// Remote generation backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, RemoteFailure>;
}
