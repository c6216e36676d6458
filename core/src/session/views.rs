//! Values handed out by the session controller. None of them hold handles.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::{AssetKind, PersistedRecord, PersonaId, PipelineState, Stage};
use crate::remote::InlinePart;

pub const PLACEHOLDER_CARD_IMAGE: &str = "https://picsum.photos/seed/placeholder/360/640";

/// A persisted record worth restoring. Never applied automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOffer {
    pub record: PersistedRecord,
}

impl RestoreOffer {
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.record.saved_at()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub minutes_ago: i64,
    pub research_chars: usize,
    pub script_chars: usize,
    pub keywords: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioReport {
    pub conversation: bool,
    pub generated: Vec<PersonaId>,
    pub failed: Vec<PersonaId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisualsReport {
    pub keywords: Vec<String>,
    pub generated: usize,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub title: String,
    pub content: String,
    pub image_prompt: String,
    pub generation_failed: bool,
    /// Stand-in image reference used when generation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder_url: Option<String>,
    #[serde(skip)]
    pub image: Option<InlinePart>,
}

/// Card news output. Lives outside the pipeline state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CardDeck {
    pub cards: Vec<Card>,
}

impl CardDeck {
    pub fn failed_count(&self) -> usize {
        self.cards.iter().filter(|c| c.generation_failed).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackView {
    pub persona: Option<PersonaId>,
    pub handle_id: String,
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetView {
    pub id: String,
    pub kind: AssetKind,
    pub prompt: String,
    pub handle_id: String,
}

/// Read-only timeline of everything produced so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoComposition {
    pub conversation: Option<TrackView>,
    pub tracks: Vec<TrackView>,
    pub assets: Vec<AssetView>,
    pub script_chars: usize,
}

impl VideoComposition {
    pub fn from_state(state: &PipelineState) -> Self {
        Self {
            conversation: state.conversation_track().map(|t| TrackView {
                persona: None,
                handle_id: t.handle.id().to_string(),
                duration: t.duration,
            }),
            tracks: state
                .audio_tracks()
                .iter()
                .map(|(persona, t)| TrackView {
                    persona: Some(persona.clone()),
                    handle_id: t.handle.id().to_string(),
                    duration: t.duration,
                })
                .collect(),
            assets: state
                .visual_assets()
                .iter()
                .map(|a| AssetView {
                    id: a.id.clone(),
                    kind: a.kind,
                    prompt: a.prompt.clone(),
                    handle_id: a.handle.id().to_string(),
                })
                .collect(),
            script_chars: state.script_text().chars().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conversation.is_none() && self.tracks.is_empty() && self.assets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub stage: Stage,
    pub research_chars: usize,
    pub script_chars: usize,
    pub keywords: Vec<String>,
    pub audio_tracks: Vec<PersonaId>,
    pub conversation: bool,
    pub visual_assets: usize,
    pub last_persisted_at: Option<DateTime<Utc>>,
}
