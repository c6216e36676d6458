//! `generateContent` request and response envelopes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use castforge_core::remote::{
    GenerateRequest, GenerateResponse, GroundingSource, InlinePart, Modality, VoiceConfig,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentBody {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: &'static str,
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SpeechConfig {
    VoiceConfig(VoiceSelection),
    MultiSpeakerVoiceConfig(MultiSpeaker),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSelection {
    pub prebuilt_voice_config: PrebuiltVoice,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoice {
    pub voice_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSpeaker {
    pub speaker_voice_configs: Vec<SpeakerVoiceConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerVoiceConfig {
    pub speaker: String,
    pub voice_config: VoiceSelection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub google_search: serde_json::Map<String, serde_json::Value>,
}

fn voice(name: &str) -> VoiceSelection {
    VoiceSelection {
        prebuilt_voice_config: PrebuiltVoice {
            voice_name: name.to_string(),
        },
    }
}

impl GenerateContentBody {
    pub fn from_request(request: &GenerateRequest) -> Self {
        let mut config = GenerationConfig::default();
        if request.json_response {
            config.response_mime_type = Some("application/json");
        }
        match request.modality {
            Modality::Text => {}
            Modality::Audio => config.response_modalities.push("AUDIO"),
            Modality::Image => config.response_modalities.push("IMAGE"),
        }
        config.speech_config = request.voice.as_ref().map(|v| match v {
            VoiceConfig::Single { voice: name } => SpeechConfig::VoiceConfig(voice(name)),
            VoiceConfig::Multi { speakers } => {
                SpeechConfig::MultiSpeakerVoiceConfig(MultiSpeaker {
                    speaker_voice_configs: speakers
                        .iter()
                        .map(|s| SpeakerVoiceConfig {
                            speaker: s.speaker.clone(),
                            voice_config: voice(&s.voice),
                        })
                        .collect(),
                })
            }
        });

        let has_config = config.response_mime_type.is_some()
            || !config.response_modalities.is_empty()
            || config.speech_config.is_some();

        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: has_config.then_some(config),
            tools: if request.web_search {
                vec![Tool {
                    google_search: serde_json::Map::new(),
                }]
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentReply {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<ReplyContent>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReplyContent {
    #[serde(default)]
    pub parts: Vec<ReplyPart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebSource>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentReply {
    /// Flatten the first candidate into the core response shape.
    pub fn into_response(self) -> Result<GenerateResponse, String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(format!("prompt blocked: {reason}"));
        }
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err("response has no candidates".to_string());
        };

        let mut texts = Vec::new();
        let mut parts = Vec::new();
        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text {
                texts.push(text);
            }
            if let Some(inline) = part.inline_data {
                let data = STANDARD
                    .decode(inline.data.trim())
                    .map_err(|e| format!("inline data is not base64: {e}"))?;
                parts.push(InlinePart {
                    mime_type: inline.mime_type,
                    data,
                });
            }
        }

        let sources = candidate
            .grounding_metadata
            .map(|m| m.grounding_chunks)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|chunk| chunk.web)
            .filter(|web| !web.uri.is_empty())
            .map(|web| GroundingSource {
                title: if web.title.is_empty() {
                    web.uri.clone()
                } else {
                    web.title
                },
                uri: web.uri,
            })
            .collect();

        if texts.is_empty() && parts.is_empty() {
            tracing::debug!(
                target: "castforge.gemini",
                finish_reason = ?candidate.finish_reason,
                "candidate carried no content"
            );
        }

        Ok(GenerateResponse {
            text: (!texts.is_empty()).then(|| texts.concat()),
            parts,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castforge_core::remote::{OperationKind, SpeakerVoice};

    #[test]
    fn text_request_has_no_config() {
        let req = GenerateRequest::text(OperationKind::ScriptGen, "m", "write");
        let body = serde_json::to_value(GenerateContentBody::from_request(&req)).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "write");
        assert!(body.get("generationConfig").is_none());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn research_with_search_and_json() {
        let req = GenerateRequest::text(OperationKind::Research, "m", "p")
            .with_web_search(true)
            .with_json();
        let body = serde_json::to_value(GenerateContentBody::from_request(&req)).unwrap();
        assert_eq!(body["tools"][0]["googleSearch"], serde_json::json!({}));
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn multi_speaker_speech_config() {
        let req = GenerateRequest::text(OperationKind::SpeechMulti, "m", "Q: hi")
            .with_modality(Modality::Audio)
            .with_voice(VoiceConfig::Multi {
                speakers: vec![SpeakerVoice {
                    speaker: "Q".into(),
                    voice: "Puck".into(),
                }],
            });
        let body = serde_json::to_value(GenerateContentBody::from_request(&req)).unwrap();
        let config = &body["generationConfig"];
        assert_eq!(config["responseModalities"][0], "AUDIO");
        let speaker = &config["speechConfig"]["multiSpeakerVoiceConfig"]["speakerVoiceConfigs"][0];
        assert_eq!(speaker["speaker"], "Q");
        assert_eq!(
            speaker["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Puck"
        );
    }

    #[test]
    fn reply_flattens_text_parts_and_sources() {
        let reply: GenerateContentReply = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "a"},
                    {"text": "b"},
                    {"inlineData": {"mimeType": "image/png", "data": "iVBORw=="}}
                ]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://x.test/1", "title": "One"}},
                    {"web": {"uri": "https://x.test/2"}},
                    {}
                ]}
            }]
        }))
        .unwrap();
        let resp = reply.into_response().unwrap();
        assert_eq!(resp.text.as_deref(), Some("ab"));
        assert_eq!(resp.parts[0].mime_type, "image/png");
        assert_eq!(resp.parts[0].data[..4], [0x89, b'P', b'N', b'G']);
        assert_eq!(resp.sources.len(), 2);
        assert_eq!(resp.sources[1].title, "https://x.test/2");
    }

    #[test]
    fn blocked_or_empty_replies_are_errors() {
        let blocked: GenerateContentReply = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(blocked.into_response().unwrap_err().contains("SAFETY"));
        assert!(GenerateContentReply::default().into_response().is_err());
    }
}
