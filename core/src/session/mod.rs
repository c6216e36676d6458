//! Session controller: the single writer of the pipeline state.
//!
//! Every stage operation checks its inputs, drives the generation client,
//! turns payloads into handles and proposes `Mutation`s to the state.
//! Displaced handles are released right after each mutation, and every
//! terminal failure surfaces exactly one notification.

mod lines;
mod views;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::audio::{encode_wav, pcm_duration, pcm_rate_from_mime, PCM_BITS_PER_SAMPLE, PCM_CHANNELS};
use crate::client::{GenerationClient, ResearchBrief, ResearchReport};
use crate::config::{AppConfig, Persona};
use crate::error::{GenerationError, HandleError, SessionError, StoreError};
use crate::executor::{run_batch, BatchOptions, BatchOutcome};
use crate::handles::{HandleStore, ResourceHandle};
use crate::notify::{EventBus, StageStatus};
use crate::pipeline::{
    AssetKind, AudioTrack, AutoSaver, Mutation, PersistenceStore, PersonaId, PipelineState, Stage,
    VisualAsset,
};
use crate::remote::{AspectRatio, CardContent, GroundingSource, InlinePart, OperationKind};

pub use lines::persona_lines;
pub use views::{
    AssetView, AudioReport, Card, CardDeck, RestoreOffer, RestoreReport, SessionStatus, TrackView,
    VideoComposition, VisualsReport, PLACEHOLDER_CARD_IMAGE,
};

const WAV_MIME: &str = "audio/wav";

pub struct SessionController {
    config: Arc<AppConfig>,
    client: GenerationClient,
    handles: Arc<dyn HandleStore>,
    store: Arc<dyn PersistenceStore>,
    autosaver: Option<AutoSaver>,
    events: EventBus,
    state: PipelineState,
    persona_ids: Vec<PersonaId>,
    stage: Stage,
    sources: Vec<GroundingSource>,
}

impl SessionController {
    /// Must be called inside a tokio runtime when autosave is enabled: the
    /// writer task is spawned here.
    pub fn new(
        config: Arc<AppConfig>,
        client: GenerationClient,
        handles: Arc<dyn HandleStore>,
        store: Arc<dyn PersistenceStore>,
        events: EventBus,
    ) -> Self {
        let autosaver = config.autosave.enabled.then(|| {
            AutoSaver::start(
                store.clone(),
                Duration::from_millis(config.autosave.debounce_ms),
            )
        });
        let persona_ids = config.personas.iter().map(|p| p.id.clone()).collect();
        Self {
            config,
            client,
            handles,
            store,
            autosaver,
            events,
            state: PipelineState::default(),
            persona_ids,
            stage: Stage::Planning,
            sources: Vec::new(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn personas(&self) -> &[Persona] {
        &self.config.personas
    }

    pub fn current_stage(&self) -> Stage {
        self.stage
    }

    /// Grounding sources of the latest research run.
    pub fn sources(&self) -> &[GroundingSource] {
        &self.sources
    }

    pub fn handle_bytes(&self, handle: &ResourceHandle) -> Result<Vec<u8>, HandleError> {
        self.handles.read(handle)
    }

    pub fn status(&mut self) -> SessionStatus {
        self.sync_persisted();
        SessionStatus {
            stage: self.stage,
            research_chars: self.state.research_text().chars().count(),
            script_chars: self.state.script_text().chars().count(),
            keywords: self.state.keywords().to_vec(),
            audio_tracks: self.state.audio_tracks().keys().cloned().collect(),
            conversation: self.state.conversation_track().is_some(),
            visual_assets: self.state.visual_assets().len(),
            last_persisted_at: self.state.last_persisted_at(),
        }
    }

    // ---- lifecycle -------------------------------------------------------

    /// Look for the previous session's record. An offer is returned only
    /// when some field is non-empty; it is never applied here.
    pub async fn start(&mut self) -> Result<Option<RestoreOffer>, SessionError> {
        self.events.stage(Stage::Planning, StageStatus::Entered);
        match self.store.load().await {
            Ok(Some(record)) if !record.is_empty() => Ok(Some(RestoreOffer { record })),
            Ok(_) => Ok(None),
            Err(StoreError::Decode(e)) => {
                tracing::warn!(
                    target: "castforge.session",
                    stage = "session.start",
                    error = %e,
                    "ignoring unreadable autosave record"
                );
                Ok(None)
            }
            Err(e) => Err(self.fail("Loading saved work", e.into())),
        }
    }

    pub fn restore(&mut self, offer: RestoreOffer) -> Result<RestoreReport, SessionError> {
        let record = offer.record;
        let report = RestoreReport {
            minutes_ago: record.minutes_since(Utc::now()),
            research_chars: record.research_text.chars().count(),
            script_chars: record.script_text.chars().count(),
            keywords: record.keywords.len(),
        };
        self.mutate(Mutation::Restore(record))?;
        tracing::info!(
            target: "castforge.session",
            stage = "session.restore",
            minutes_ago = report.minutes_ago,
            research_chars = report.research_chars,
            script_chars = report.script_chars
        );
        self.events.success(format!(
            "Restored work saved {} minutes ago",
            report.minutes_ago
        ));
        Ok(report)
    }

    pub async fn discard_restore(&mut self) -> Result<(), SessionError> {
        if let Err(e) = self.delete_persisted().await {
            return Err(self.fail("Discarding saved work", e.into()));
        }
        self.events.info("Discarded saved work");
        Ok(())
    }

    /// Release every handle once, clear all fields, cancel any pending
    /// autosave and delete the persisted record.
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        let released = self.release_all(PipelineState::clear);
        self.sources.clear();
        self.stage = Stage::Planning;
        tracing::info!(target: "castforge.session", stage = "session.reset", released);
        if let Err(e) = self.delete_persisted().await {
            return Err(self.fail("Clearing saved work", e.into()));
        }
        self.events.info("All data cleared");
        Ok(())
    }

    /// The writer task orders the delete after any write it already started.
    async fn delete_persisted(&self) -> Result<(), StoreError> {
        match &self.autosaver {
            Some(saver) => saver.clear().await,
            None => self.store.delete().await,
        }
    }

    /// Flush the pending autosave and release every handle.
    pub async fn shutdown(mut self) {
        let released = self.release_all(PipelineState::take_all_handles);
        if let Some(saver) = self.autosaver.take() {
            saver.shutdown().await;
        }
        tracing::info!(target: "castforge.session", stage = "session.shutdown", released);
    }

    /// Record navigation and report whether the stage's inputs exist.
    /// Navigation is never blocked.
    pub fn enter_stage(&mut self, stage: Stage) -> bool {
        self.stage = stage;
        self.events.stage(stage, StageStatus::Entered);
        tracing::debug!(target: "castforge.session", stage = "session.navigate", to = stage.id());
        if stage == Stage::Expansion {
            self.events
                .info("Shorts expansion has no generation step; continue with card news");
        }
        match stage.requires(&self.state) {
            Ok(()) => true,
            Err(e) => {
                self.events.info(format!("{}: {}", stage.label(), e));
                false
            }
        }
    }

    // ---- planning & scripting -------------------------------------------

    pub async fn run_research(
        &mut self,
        brief: ResearchBrief,
    ) -> Result<ResearchReport, SessionError> {
        if brief.topic.trim().is_empty() {
            return Err(self.fail("Research", SessionError::precondition("enter an analysis topic")));
        }
        self.begin(Stage::Planning, "Analyzing the data");
        let observer = retry_observer(self.events.clone(), OperationKind::Research);
        let report = match self.client.research(&brief, &observer).await {
            Ok(report) => report,
            Err(e) => return Err(self.fail_stage(Stage::Planning, "Research", e.into())),
        };
        self.mutate(Mutation::SetResearch(report.text.clone()))?;
        self.sources = report.sources.clone();
        self.finish(Stage::Planning, "Research complete");
        Ok(report)
    }

    /// Fails with a precondition error, and no remote call, without research.
    pub async fn generate_script(&mut self) -> Result<String, SessionError> {
        if let Err(e) = Stage::Scripting.requires(&self.state) {
            return Err(self.fail("Script generation", e));
        }
        self.begin(Stage::Scripting, "Writing the podcast script");
        let research = self.state.research_text().to_string();
        let script = match self.client.generate_script(&research).await {
            Ok(script) => script,
            Err(e) => return Err(self.fail_stage(Stage::Scripting, "Script generation", e.into())),
        };
        self.mutate(Mutation::SetScript(script.clone()))?;
        self.finish(Stage::Scripting, "Script generated");
        Ok(script)
    }

    /// Replace the script wholesale with its speech-optimized version.
    pub async fn optimize_script(&mut self) -> Result<String, SessionError> {
        let script = self.require_script("Script optimization")?;
        self.begin(Stage::Scripting, "Optimizing the script for speech");
        let observer = retry_observer(self.events.clone(), OperationKind::ScriptOptimize);
        let optimized = match self.client.optimize_script(&script, &observer).await {
            Ok(text) => text,
            Err(e) => {
                return Err(self.fail_stage(Stage::Scripting, "Script optimization", e.into()))
            }
        };
        self.mutate(Mutation::SetScript(optimized.clone()))?;
        self.finish(Stage::Scripting, "Script optimized");
        Ok(optimized)
    }

    pub fn edit_script(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.mutate(Mutation::SetScript(text.into()))
    }

    // ---- audio -----------------------------------------------------------

    /// Conversation track first, then one track per persona. Individual
    /// failures are reported and skipped.
    pub async fn generate_audio(&mut self) -> Result<AudioReport, SessionError> {
        let script = self.require_script("Audio generation")?;
        self.begin(Stage::Scripting, "Generating audio");
        let regenerated = self.persona_ids.clone();
        self.mutate(Mutation::ClearAudio(regenerated))?;
        self.mutate(Mutation::ClearConversation)?;

        let mut report = AudioReport::default();
        match self.conversation_track(&script).await {
            Ok(track) => {
                self.mutate(Mutation::SetConversationTrack(track))?;
                report.conversation = true;
            }
            Err(e) => self.events.error(format!("Conversation audio failed: {e}")),
        }

        let roster = self.config.personas.clone();
        let total = roster.len();
        let window = BatchOptions::with_window(self.config.batch.speech_window);
        let observer = retry_observer(self.events.clone(), OperationKind::SpeechSingle);
        let client = &self.client;
        let events = &self.events;
        let script_ref = script.as_str();
        let observer_ref = &observer;

        let batch = run_batch(
            roster.clone(),
            window,
            |_, persona: Persona| async move {
                client
                    .synthesize_speech(script_ref, &persona, observer_ref)
                    .await
            },
            |outcome| {
                events.item_settled(Stage::Scripting, outcome.index(), total, outcome.is_success());
                if let BatchOutcome::Failure { input, error, .. } = outcome {
                    events.error(format!("Audio for {} failed: {error}", input.name));
                }
            },
        )
        .await;

        for outcome in batch.into_outcomes() {
            match outcome {
                BatchOutcome::Success { index, value } => {
                    let Some(persona) = roster.get(index) else {
                        continue;
                    };
                    match self.audio_track(value) {
                        Ok(track) => {
                            self.mutate(Mutation::SetAudioTrack {
                                persona: persona.id.clone(),
                                track,
                            })?;
                            report.generated.push(persona.id.clone());
                        }
                        Err(e) => {
                            self.events
                                .error(format!("Audio for {} failed: {e}", persona.name));
                            report.failed.push(persona.id.clone());
                        }
                    }
                }
                BatchOutcome::Failure { input, .. } => report.failed.push(input.id),
            }
        }

        tracing::info!(
            target: "castforge.session",
            stage = "session.audio",
            conversation = report.conversation,
            generated = report.generated.len(),
            failed = report.failed.len()
        );
        self.finish(
            Stage::Scripting,
            format!(
                "Generated {} of {} persona audio tracks",
                report.generated.len(),
                total
            ),
        );
        Ok(report)
    }

    /// Regenerate only the multi-speaker conversation track.
    pub async fn generate_conversation(&mut self) -> Result<(), SessionError> {
        let script = self.require_script("Conversation audio")?;
        self.begin(Stage::Scripting, "Generating the conversation track");
        self.mutate(Mutation::ClearConversation)?;
        let track = match self.conversation_track(&script).await {
            Ok(track) => track,
            Err(e) => return Err(self.fail_stage(Stage::Scripting, "Conversation audio", e)),
        };
        self.mutate(Mutation::SetConversationTrack(track))?;
        self.finish(Stage::Scripting, "Conversation audio generated");
        Ok(())
    }

    /// Regenerate one persona's track from that persona's lines only.
    pub async fn generate_persona_voice(&mut self, persona_id: &str) -> Result<(), SessionError> {
        let script = self.require_script("Voice generation")?;
        let Some(persona) = self.config.persona(persona_id).cloned() else {
            return Err(self.fail(
                "Voice generation",
                SessionError::UnknownPersona(persona_id.to_string()),
            ));
        };
        let lines = persona_lines(&script, &persona, &self.config.personas);
        if lines.is_empty() {
            return Err(self.fail(
                "Voice generation",
                SessionError::precondition(format!(
                    "no lines for {} found in the script",
                    persona.name
                )),
            ));
        }

        self.begin(Stage::Scripting, format!("Generating the voice of {}", persona.name));
        self.mutate(Mutation::ClearAudio(vec![persona.id.clone()]))?;
        let observer = retry_observer(self.events.clone(), OperationKind::SpeechSingle);
        let track = match self.client.synthesize_speech(&lines, &persona, &observer).await {
            Ok(part) => self.audio_track(part),
            Err(e) => Err(e.into()),
        };
        let track = match track {
            Ok(track) => track,
            Err(e) => {
                let what = format!("Voice of {}", persona.name);
                return Err(self.fail_stage(Stage::Scripting, &what, e));
            }
        };
        self.mutate(Mutation::SetAudioTrack {
            persona: persona.id.clone(),
            track,
        })?;
        self.finish(Stage::Scripting, format!("Voice of {} generated", persona.name));
        Ok(())
    }

    // ---- visuals & video -------------------------------------------------

    /// Keywords, then image prompts, then 16:9 images in windows. Each
    /// image is appended to the state as soon as it settles.
    pub async fn generate_visuals(&mut self) -> Result<VisualsReport, SessionError> {
        if let Err(e) = Stage::Visuals.requires(&self.state) {
            return Err(self.fail("Visual generation", e));
        }
        let script = self.state.script_text().to_string();
        self.begin(Stage::Visuals, "Extracting keywords from the script");

        let keywords = match self.client.extract_keywords(&script).await {
            Ok(k) => k,
            Err(e) => return Err(self.fail_stage(Stage::Visuals, "Keyword extraction", e.into())),
        };
        self.mutate(Mutation::SetKeywords(keywords.clone()))?;

        self.events.progress(Stage::Visuals, "Optimizing image prompts");
        let prompts = match self.client.generate_image_prompts(&keywords).await {
            Ok(p) => p,
            Err(e) => {
                return Err(self.fail_stage(Stage::Visuals, "Image prompt generation", e.into()))
            }
        };

        self.events
            .progress(Stage::Visuals, format!("Generating {} images", prompts.len()));
        let total = prompts.len();
        let window = BatchOptions::with_window(self.config.batch.image_window);
        let observer = retry_observer(self.events.clone(), OperationKind::ImageGen);
        let stamp = Utc::now().timestamp_millis();
        let mut generated = 0usize;
        let mut failed: Vec<(usize, String)> = Vec::new();

        let client = &self.client;
        let events = &self.events;
        let handles = &self.handles;
        let persona_ids = &self.persona_ids;
        let state = &mut self.state;
        let observer_ref = &observer;

        run_batch(
            prompts.clone(),
            window,
            |_, (_, prompt): (String, String)| async move {
                client
                    .generate_image(&prompt, AspectRatio::Landscape, observer_ref)
                    .await
            },
            |outcome| {
                events.item_settled(Stage::Visuals, outcome.index(), total, outcome.is_success());
                let (index, value) = match outcome {
                    BatchOutcome::Failure { index, input, error } => {
                        events.error(format!("Image for \"{}\" failed: {error}", input.0));
                        failed.push((*index, input.0.clone()));
                        return;
                    }
                    BatchOutcome::Success { index, value } => (*index, value),
                };
                let Some((keyword, prompt)) = prompts.get(index) else {
                    return;
                };
                let asset = handles
                    .create(value.data.clone(), &value.mime_type)
                    .map(|handle| VisualAsset {
                        id: format!("img_{stamp}_{index}"),
                        kind: AssetKind::Image,
                        handle,
                        prompt: prompt.clone(),
                        keyword: Some(keyword.clone()),
                    });
                let appended: Result<(), SessionError> = match asset {
                    Ok(asset) => match state.apply(Mutation::AppendAssets(vec![asset]), persona_ids) {
                        Ok(applied) => {
                            for handle in applied.displaced {
                                handles.release(handle);
                            }
                            Ok(())
                        }
                        Err(rejected) => {
                            for handle in rejected.handles {
                                handles.release(handle);
                            }
                            Err(rejected.error)
                        }
                    },
                    Err(e) => Err(e.into()),
                };
                match appended {
                    Ok(()) => generated += 1,
                    Err(e) => {
                        events.error(format!("Image for \"{keyword}\" failed: {e}"));
                        failed.push((index, keyword.clone()));
                    }
                }
            },
        )
        .await;

        failed.sort_by_key(|(index, _)| *index);
        let report = VisualsReport {
            keywords,
            generated,
            failed: failed.into_iter().map(|(_, keyword)| keyword).collect(),
        };

        tracing::info!(
            target: "castforge.session",
            stage = "session.visuals",
            generated = report.generated,
            failed = report.failed.len()
        );
        self.finish(
            Stage::Visuals,
            format!("Generated {} of {} images", report.generated, total),
        );
        Ok(report)
    }

    /// Explicit user clear of every visual asset. Returns how many were released.
    pub fn clear_visuals(&mut self) -> Result<usize, SessionError> {
        let count = self.state.visual_assets().len();
        self.mutate(Mutation::ClearVisuals)?;
        self.events.info(format!("Cleared {count} visual assets"));
        Ok(count)
    }

    /// Read-only timeline of the tracks and assets produced so far.
    pub fn compose_video(&self) -> VideoComposition {
        let composition = VideoComposition::from_state(&self.state);
        if composition.is_empty() {
            self.events
                .info("Nothing to compose yet; generate audio or visuals first");
        }
        composition
    }

    // ---- card news -------------------------------------------------------

    /// Card text, then one 9:16 image per card. A card whose image failed
    /// gets the placeholder and is flagged. The deck is not kept in state.
    pub async fn generate_card_news(&mut self) -> Result<CardDeck, SessionError> {
        if let Err(e) = Stage::CardNews.requires(&self.state) {
            return Err(self.fail("Card news", e));
        }
        let script = self.state.script_text().to_string();
        self.begin(Stage::CardNews, "Writing card news");

        let observer = retry_observer(self.events.clone(), OperationKind::CardNewsGen);
        let contents = match self.client.generate_card_news(&script, &observer).await {
            Ok(cards) => cards,
            Err(e) => return Err(self.fail_stage(Stage::CardNews, "Card news", e.into())),
        };

        self.events
            .progress(Stage::CardNews, format!("Generating {} card images", contents.len()));
        let total = contents.len();
        let window = BatchOptions::with_window(self.config.batch.image_window);
        let image_observer = retry_observer(self.events.clone(), OperationKind::ImageGen);
        let client = &self.client;
        let events = &self.events;
        let observer_ref = &image_observer;

        let batch = run_batch(
            contents.clone(),
            window,
            |_, card: CardContent| async move {
                client
                    .generate_image(&card.image_prompt, AspectRatio::Portrait, observer_ref)
                    .await
            },
            |outcome| {
                events.item_settled(Stage::CardNews, outcome.index(), total, outcome.is_success());
                if let BatchOutcome::Failure { index, error, .. } = outcome {
                    events.error(format!("Image for card {} failed: {error}", index + 1));
                }
            },
        )
        .await;

        let failed = batch.failure_count();
        let cards = contents
            .into_iter()
            .zip(batch.into_outcomes())
            .map(|(content, outcome)| card_from(content, outcome))
            .collect();

        self.finish(
            Stage::CardNews,
            if failed == 0 {
                format!("Generated {total} cards")
            } else {
                format!("Generated {total} cards ({failed} with placeholder images)")
            },
        );
        Ok(CardDeck { cards })
    }

    // ---- internals -------------------------------------------------------

    /// Apply a mutation, release what it displaced and schedule an autosave
    /// when a tracked field changed.
    fn mutate(&mut self, mutation: Mutation) -> Result<(), SessionError> {
        self.sync_persisted();
        match self.state.apply(mutation, &self.persona_ids) {
            Ok(applied) => {
                for handle in applied.displaced {
                    self.handles.release(handle);
                }
                if applied.tracked_change {
                    if let Some(saver) = &self.autosaver {
                        saver.schedule(self.state.snapshot());
                    }
                }
                Ok(())
            }
            Err(rejected) => {
                for handle in rejected.handles {
                    self.handles.release(handle);
                }
                Err(self.fail("Update", rejected.error))
            }
        }
    }

    fn sync_persisted(&mut self) {
        let Some(saved) = self.autosaver.as_ref().and_then(AutoSaver::last_saved) else {
            return;
        };
        if self.state.last_persisted_at() != Some(saved) {
            // carries no handles and is never rejected
            let _ = self
                .state
                .apply(Mutation::MarkPersisted(saved), &self.persona_ids);
        }
    }

    fn release_all(
        &mut self,
        drain: impl FnOnce(&mut PipelineState) -> Vec<ResourceHandle>,
    ) -> usize {
        let handles = drain(&mut self.state);
        let count = handles.len();
        for handle in handles {
            self.handles.release(handle);
        }
        count
    }

    fn require_script(&self, what: &str) -> Result<String, SessionError> {
        let script = self.state.script_text();
        if script.trim().is_empty() {
            return Err(self.fail(
                what,
                SessionError::precondition("generate a script in the scripting stage first"),
            ));
        }
        Ok(script.to_string())
    }

    async fn conversation_track(&self, script: &str) -> Result<AudioTrack, SessionError> {
        let observer = retry_observer(self.events.clone(), OperationKind::SpeechMulti);
        let part = self
            .client
            .synthesize_conversation(script, &self.config.personas, &observer)
            .await?;
        self.audio_track(part)
    }

    /// Wrap raw PCM in a WAV container and store it behind a handle.
    fn audio_track(&self, part: InlinePart) -> Result<AudioTrack, SessionError> {
        if part.mime_type.starts_with(WAV_MIME) {
            let handle = self.handles.create(part.data, WAV_MIME)?;
            return Ok(AudioTrack {
                handle,
                duration: None,
            });
        }
        let rate = pcm_rate_from_mime(&part.mime_type);
        let wav = encode_wav(&part.data, rate, PCM_CHANNELS, PCM_BITS_PER_SAMPLE)?;
        let duration = pcm_duration(part.data.len(), rate, PCM_CHANNELS, PCM_BITS_PER_SAMPLE);
        let handle = self.handles.create(wav, WAV_MIME)?;
        Ok(AudioTrack { handle, duration })
    }

    fn begin(&self, stage: Stage, message: impl Into<String>) {
        self.events.stage(stage, StageStatus::Running);
        self.events.progress(stage, message);
    }

    fn finish(&self, stage: Stage, message: impl Into<String>) {
        self.events.stage(stage, StageStatus::Completed);
        self.events.success(message);
    }

    fn fail_stage(&self, stage: Stage, what: &str, error: SessionError) -> SessionError {
        self.events.stage(stage, StageStatus::Failed);
        self.fail(what, error)
    }

    /// Log and notify once. Unmet preconditions are warnings.
    fn fail(&self, what: &str, error: SessionError) -> SessionError {
        if error.is_precondition() {
            tracing::info!(
                target: "castforge.session",
                stage = "session.precondition",
                operation = what,
                error = %error
            );
            self.events.warning(format!("{what}: {error}"));
        } else {
            tracing::error!(
                target: "castforge.session",
                stage = "session.failed",
                operation = what,
                error = %error
            );
            self.events.error(format!("{what} failed: {error}"));
        }
        error
    }
}

fn retry_observer(
    events: EventBus,
    operation: OperationKind,
) -> impl Fn(u32, &GenerationError) + Send + Sync {
    move |attempt, error| events.retry(operation, attempt, error.to_string())
}

fn card_from(content: CardContent, outcome: BatchOutcome<CardContent, InlinePart>) -> Card {
    let CardContent {
        title,
        content,
        image_prompt,
    } = content;
    match outcome {
        BatchOutcome::Success { value, .. } => Card {
            title,
            content,
            image_prompt,
            generation_failed: false,
            placeholder_url: None,
            image: Some(value),
        },
        BatchOutcome::Failure { .. } => Card {
            title,
            content,
            image_prompt,
            generation_failed: true,
            placeholder_url: Some(PLACEHOLDER_CARD_IMAGE.to_string()),
            image: None,
        },
    }
}
