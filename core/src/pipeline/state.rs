use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::handles::ResourceHandle;

use super::store::PersistedRecord;

pub type PersonaId = String;

#[derive(Debug)]
pub struct AudioTrack {
    pub handle: ResourceHandle,
    /// `None` when the length is unknown.
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
}

#[derive(Debug)]
pub struct VisualAsset {
    pub id: String,
    pub kind: AssetKind,
    pub handle: ResourceHandle,
    pub prompt: String,
    pub keyword: Option<String>,
}

/// A proposed change to the pipeline state. Applying it is the only way the
/// state changes.
#[derive(Debug)]
pub enum Mutation {
    SetResearch(String),
    SetScript(String),
    SetKeywords(Vec<String>),
    AppendAssets(Vec<VisualAsset>),
    SetAudioTrack { persona: PersonaId, track: AudioTrack },
    SetConversationTrack(AudioTrack),
    /// Drop the tracks of the given personas ahead of regeneration.
    ClearAudio(Vec<PersonaId>),
    ClearConversation,
    ClearVisuals,
    Restore(PersistedRecord),
    MarkPersisted(DateTime<Utc>),
}

/// Effect of an applied mutation.
#[derive(Debug, Default)]
pub struct Applied {
    /// Handles no longer referenced by the state. The caller must release them.
    pub displaced: Vec<ResourceHandle>,
    /// Whether research, script or keywords changed.
    pub tracked_change: bool,
}

/// A rejected mutation. Any handles it carried come back for release.
#[derive(Debug)]
pub struct Rejected {
    pub error: SessionError,
    pub handles: Vec<ResourceHandle>,
}

#[derive(Debug, Default)]
pub struct PipelineState {
    research_text: String,
    script_text: String,
    keywords: Vec<String>,
    audio_tracks: BTreeMap<PersonaId, AudioTrack>,
    conversation_track: Option<AudioTrack>,
    visual_assets: Vec<VisualAsset>,
    last_persisted_at: Option<DateTime<Utc>>,
    research_seen: bool,
}

impl PipelineState {
    pub fn research_text(&self) -> &str {
        &self.research_text
    }

    pub fn script_text(&self) -> &str {
        &self.script_text
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn audio_tracks(&self) -> &BTreeMap<PersonaId, AudioTrack> {
        &self.audio_tracks
    }

    pub fn conversation_track(&self) -> Option<&AudioTrack> {
        self.conversation_track.as_ref()
    }

    pub fn visual_assets(&self) -> &[VisualAsset] {
        &self.visual_assets
    }

    pub fn last_persisted_at(&self) -> Option<DateTime<Utc>> {
        self.last_persisted_at
    }

    pub fn handle_count(&self) -> usize {
        self.audio_tracks.len()
            + usize::from(self.conversation_track.is_some())
            + self.visual_assets.len()
    }

    pub fn apply(
        &mut self,
        mutation: Mutation,
        known_personas: &[PersonaId],
    ) -> Result<Applied, Rejected> {
        let mut applied = Applied::default();
        match mutation {
            Mutation::SetResearch(text) => {
                if !text.trim().is_empty() {
                    self.research_seen = true;
                }
                applied.tracked_change = self.research_text != text;
                self.research_text = text;
            }
            Mutation::SetScript(text) => {
                if !text.trim().is_empty() && !self.research_seen {
                    return Err(Rejected {
                        error: SessionError::precondition(
                            "a script can only follow research; run research first",
                        ),
                        handles: Vec::new(),
                    });
                }
                applied.tracked_change = self.script_text != text;
                self.script_text = text;
            }
            Mutation::SetKeywords(keywords) => {
                applied.tracked_change = self.keywords != keywords;
                self.keywords = keywords;
            }
            Mutation::AppendAssets(assets) => {
                self.visual_assets.extend(assets);
            }
            Mutation::SetAudioTrack { persona, track } => {
                if !known_personas.contains(&persona) {
                    return Err(Rejected {
                        error: SessionError::UnknownPersona(persona),
                        handles: vec![track.handle],
                    });
                }
                if let Some(previous) = self.audio_tracks.insert(persona, track) {
                    applied.displaced.push(previous.handle);
                }
            }
            Mutation::SetConversationTrack(track) => {
                if let Some(previous) = self.conversation_track.replace(track) {
                    applied.displaced.push(previous.handle);
                }
            }
            Mutation::ClearAudio(personas) => {
                for persona in personas {
                    if let Some(previous) = self.audio_tracks.remove(&persona) {
                        applied.displaced.push(previous.handle);
                    }
                }
            }
            Mutation::ClearConversation => {
                if let Some(previous) = self.conversation_track.take() {
                    applied.displaced.push(previous.handle);
                }
            }
            Mutation::ClearVisuals => {
                applied
                    .displaced
                    .extend(self.visual_assets.drain(..).map(|a| a.handle));
            }
            Mutation::Restore(record) => {
                if !record.research_text.trim().is_empty() || !record.script_text.trim().is_empty() {
                    self.research_seen = true;
                }
                applied.tracked_change = self.research_text != record.research_text
                    || self.script_text != record.script_text
                    || self.keywords != record.keywords;
                self.research_text = record.research_text;
                self.script_text = record.script_text;
                self.keywords = record.keywords;
            }
            Mutation::MarkPersisted(at) => {
                self.last_persisted_at = Some(at);
            }
        }
        Ok(applied)
    }

    /// The autosave-tracked fields. The timestamp is stamped at write time.
    pub fn snapshot(&self) -> PersistedRecord {
        PersistedRecord {
            research_text: self.research_text.clone(),
            script_text: self.script_text.clone(),
            keywords: self.keywords.clone(),
            timestamp: 0,
        }
    }

    /// Drain every held handle, leaving the text fields untouched.
    pub fn take_all_handles(&mut self) -> Vec<ResourceHandle> {
        let mut handles: Vec<ResourceHandle> = std::mem::take(&mut self.audio_tracks)
            .into_values()
            .map(|t| t.handle)
            .collect();
        handles.extend(self.conversation_track.take().map(|t| t.handle));
        handles.extend(self.visual_assets.drain(..).map(|a| a.handle));
        handles
    }

    /// Empty every field; returns the handles that must be released.
    pub fn clear(&mut self) -> Vec<ResourceHandle> {
        let handles = self.take_all_handles();
        *self = Self::default();
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn personas() -> Vec<PersonaId> {
        vec!["q".to_string(), "jiyoung".to_string()]
    }

    fn handle(id: &str) -> ResourceHandle {
        ResourceHandle::new(id, "audio/wav", 4)
    }

    fn track(id: &str) -> AudioTrack {
        AudioTrack {
            handle: handle(id),
            duration: None,
        }
    }

    fn ids(handles: &[ResourceHandle]) -> Vec<&str> {
        handles.iter().map(|h| h.id()).collect()
    }

    #[test]
    fn script_requires_prior_research() {
        let mut state = PipelineState::default();
        let rejected = state
            .apply(Mutation::SetScript("S".into()), &personas())
            .unwrap_err();
        assert!(rejected.error.is_precondition());

        state
            .apply(Mutation::SetResearch("R".into()), &personas())
            .unwrap();
        assert!(state.apply(Mutation::SetScript("S".into()), &personas()).unwrap().tracked_change);

        // research may be edited away afterwards; the script stays valid
        state.apply(Mutation::SetResearch(String::new()), &personas()).unwrap();
        assert!(state.apply(Mutation::SetScript("S2".into()), &personas()).is_ok());
    }

    #[test]
    fn replacing_a_track_displaces_the_old_handle() {
        let mut state = PipelineState::default();
        state
            .apply(
                Mutation::SetAudioTrack {
                    persona: "q".into(),
                    track: track("a1"),
                },
                &personas(),
            )
            .unwrap();
        let applied = state
            .apply(
                Mutation::SetAudioTrack {
                    persona: "q".into(),
                    track: track("a2"),
                },
                &personas(),
            )
            .unwrap();
        assert_eq!(ids(&applied.displaced), vec!["a1"]);
        assert!(!applied.tracked_change);
        assert_eq!(state.audio_tracks()["q"].handle.id(), "a2");
    }

    #[test]
    fn unknown_persona_returns_its_handle() {
        let mut state = PipelineState::default();
        let rejected = state
            .apply(
                Mutation::SetAudioTrack {
                    persona: "ghost".into(),
                    track: track("g"),
                },
                &personas(),
            )
            .unwrap_err();
        assert!(matches!(rejected.error, SessionError::UnknownPersona(ref p) if p == "ghost"));
        assert_eq!(ids(&rejected.handles), vec!["g"]);
        assert_eq!(state.handle_count(), 0);
    }

    #[test]
    fn clear_returns_every_handle_once() {
        let mut state = PipelineState::default();
        let known = personas();
        state.apply(Mutation::SetResearch("R".into()), &known).unwrap();
        state
            .apply(Mutation::SetAudioTrack { persona: "q".into(), track: track("a") }, &known)
            .unwrap();
        state
            .apply(Mutation::SetConversationTrack(track("c")), &known)
            .unwrap();
        state
            .apply(
                Mutation::AppendAssets(vec![VisualAsset {
                    id: "img_1_0".into(),
                    kind: AssetKind::Image,
                    handle: ResourceHandle::new("v", "image/png", 1),
                    prompt: "p".into(),
                    keyword: None,
                }]),
                &known,
            )
            .unwrap();
        assert_eq!(state.handle_count(), 3);

        let mut released = ids(&state.clear()).into_iter().map(String::from).collect::<Vec<_>>();
        released.sort();
        assert_eq!(released, vec!["a", "c", "v"]);
        assert_eq!(state.handle_count(), 0);
        assert!(state.research_text().is_empty());
        assert!(state.clear().is_empty());
    }

    #[test]
    fn restore_overwrites_tracked_fields() {
        let mut state = PipelineState::default();
        let applied = state
            .apply(
                Mutation::Restore(PersistedRecord {
                    research_text: String::new(),
                    script_text: "S".into(),
                    keywords: vec!["k".into()],
                    timestamp: 1,
                }),
                &personas(),
            )
            .unwrap();
        assert!(applied.tracked_change);
        assert_eq!(state.script_text(), "S");
        assert_eq!(state.snapshot().keywords, vec!["k".to_string()]);
        // a restored script keeps the research-before-script history
        assert!(state.apply(Mutation::SetScript("S2".into()), &personas()).is_ok());
    }
}
