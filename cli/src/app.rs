//! Assembly layer: applies flag overrides to the config and wires the
//! session controller from the plugin factories.
use std::sync::Arc;

use castforge_core::config::{load_default, load_from_path, AppConfig};
use castforge_core::error::CliError;
use castforge_core::{EventBus, GenerationClient, SessionController};
use castforge_plugins::factory;

use crate::commands::cli::{Args, Commands};

pub fn load_config(args: &Args) -> Result<AppConfig, CliError> {
    let mut cfg = match &args.config {
        Some(path) => {
            let mut cfg = load_from_path(path).map_err(|e| CliError::Config(e.to_string()))?;
            castforge_core::config::apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
            cfg
        }
        None => load_default().map_err(|e| CliError::Config(e.to_string()))?,
    };
    apply_flags(args, &mut cfg);
    Ok(cfg)
}

/// A one-shot run never asks about saved work, so it must not write over it.
fn apply_flags(args: &Args, cfg: &mut AppConfig) {
    if args.no_autosave || matches!(args.command, Some(Commands::Run(_))) {
        cfg.autosave.enabled = false;
    }
}

/// Everything a command needs: the controller plus the bus it reports on.
pub struct AppContext {
    pub session: SessionController,
    pub events: EventBus,
}

#[tracing::instrument(name = "cli.build_session", skip(cfg), fields(project = %cfg.project_id))]
pub fn build_session(cfg: AppConfig) -> Result<AppContext, CliError> {
    let backend = factory::build_backend(&cfg).map_err(|e| CliError::Config(e.to_string()))?;
    let store = factory::build_store(&cfg)?;
    let handles = factory::build_handles(&cfg)?;
    let cfg = Arc::new(cfg);
    let client = GenerationClient::new(backend, cfg.clone());
    let events = EventBus::default();
    tracing::debug!(
        target: "castforge.cli",
        backend = client.backend_name(),
        autosave = cfg.autosave.enabled,
        "session assembled"
    );
    let session = SessionController::new(cfg, client, handles, store, events.clone());
    Ok(AppContext { session, events })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn autosave_for(argv: &[&str]) -> bool {
        let args = Args::parse_from(argv);
        let mut cfg = AppConfig::default();
        cfg.autosave.enabled = true;
        apply_flags(&args, &mut cfg);
        cfg.autosave.enabled
    }

    #[test]
    fn one_shot_run_never_autosaves() {
        assert!(!autosave_for(&["castforge", "run", "--topic", "derby"]));
    }

    #[test]
    fn session_keeps_autosave_unless_disabled() {
        assert!(autosave_for(&["castforge"]));
        assert!(autosave_for(&["castforge", "session"]));
        assert!(!autosave_for(&["castforge", "--no-autosave", "session"]));
    }
}
