//! Writes session artefacts to a directory with timestamped names.
use std::path::{Path, PathBuf};

use castforge_core::error::CliError;
use castforge_core::session::CardDeck;
use castforge_core::SessionController;

pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type.split(';').next().unwrap_or("").trim() {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "audio/wav" | "audio/x-wav" => "wav",
        _ => "png",
    }
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn write(dir: &Path, name: String, bytes: &[u8], written: &mut Vec<PathBuf>) -> Result<(), CliError> {
    let path = dir.join(name);
    std::fs::write(&path, bytes)?;
    tracing::debug!(target: "castforge.cli", path = %path.display(), bytes = bytes.len(), "exported");
    written.push(path);
    Ok(())
}

/// Research, script, audio tracks and B-roll images currently held by the
/// session. Empty fields are skipped.
pub fn export_session(
    session: &SessionController,
    dir: &Path,
    stamp: &str,
) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(dir)?;
    let state = session.state();
    let mut written = Vec::new();

    if !state.research_text().is_empty() {
        write(dir, format!("research_{stamp}.txt"), state.research_text().as_bytes(), &mut written)?;
    }
    if !state.script_text().is_empty() {
        write(dir, format!("podcast_script_{stamp}.txt"), state.script_text().as_bytes(), &mut written)?;
    }
    if let Some(track) = state.conversation_track() {
        let bytes = session.handle_bytes(&track.handle).map_err(anyhow::Error::from)?;
        write(dir, format!("conversation_{stamp}.wav"), &bytes, &mut written)?;
    }
    for (persona, track) in state.audio_tracks() {
        let bytes = session.handle_bytes(&track.handle).map_err(anyhow::Error::from)?;
        write(dir, format!("voice_{}_{stamp}.wav", file_safe(persona)), &bytes, &mut written)?;
    }
    for (index, asset) in state.visual_assets().iter().enumerate() {
        let bytes = session.handle_bytes(&asset.handle).map_err(anyhow::Error::from)?;
        let label = asset.keyword.as_deref().map(file_safe).unwrap_or_else(|| asset.id.clone());
        write(
            dir,
            format!("broll_{:02}_{label}_{stamp}.{}", index + 1, asset.handle.extension()),
            &bytes,
            &mut written,
        )?;
    }
    Ok(written)
}

/// Card JSON plus one image file per card that has generated bytes.
pub fn export_deck(deck: &CardDeck, dir: &Path, stamp: &str) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    let json = serde_json::to_vec_pretty(deck).map_err(anyhow::Error::from)?;
    write(dir, format!("card_news_{stamp}.json"), &json, &mut written)?;
    for (index, card) in deck.cards.iter().enumerate() {
        if let Some(image) = &card.image {
            write(
                dir,
                format!("card_{:02}_{stamp}.{}", index + 1, extension_for(&image.mime_type)),
                &image.data,
                &mut written,
            )?;
        }
    }
    Ok(written)
}
