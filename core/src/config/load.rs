use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default castforge data directory: ~/.castforge
pub fn get_castforge_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".castforge"))
}

/// Resolved data directory: the configured one, or ~/.castforge.
pub fn resolve_data_dir(cfg: &AppConfig) -> anyhow::Result<PathBuf> {
    match cfg.autosave.data_dir.as_deref().map(str::trim) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => get_castforge_data_dir(),
    }
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.castforge/config.toml
    let data_dir = get_castforge_data_dir()?;
    let user_config = data_dir.join("config.toml");

    // Priority 2: ./config.toml
    let local_config = Path::new("config.toml");

    let mut cfg = if user_config.exists() {
        load_from_path(&user_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg.logging.file
        && cfg
            .logging
            .directory
            .as_ref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
    {
        let logs_dir = data_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read config {}: {e}", path.display()))?;
    toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse config {}: {e}", path.display()))
}

/// Environment overrides (highest priority). The API key is taken from the
/// first non-empty of CASTFORGE_API_KEY, GEMINI_API_KEY, API_KEY.
pub fn apply_env_overrides(cfg: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = ["CASTFORGE_API_KEY", "GEMINI_API_KEY", "API_KEY"]
        .iter()
        .find_map(|k| non_empty(k))
    {
        cfg.remote.api_key = key;
    }
    if let Some(url) = non_empty("CASTFORGE_BASE_URL") {
        cfg.remote.base_url = url;
    }
    if let Some(level) = non_empty("CASTFORGE_LOG_LEVEL") {
        cfg.logging.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn api_key_precedence() {
        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, env(&[("API_KEY", "c"), ("GEMINI_API_KEY", "b")]));
        assert_eq!(cfg.remote.api_key, "b");

        let mut cfg = AppConfig::default();
        apply_env_overrides(
            &mut cfg,
            env(&[("CASTFORGE_API_KEY", "a"), ("GEMINI_API_KEY", "b")]),
        );
        assert_eq!(cfg.remote.api_key, "a");
    }

    #[test]
    fn blank_values_are_ignored() {
        let mut cfg = AppConfig::default();
        let before = cfg.remote.base_url.clone();
        apply_env_overrides(
            &mut cfg,
            env(&[("CASTFORGE_BASE_URL", "  "), ("CASTFORGE_API_KEY", "")]),
        );
        assert_eq!(cfg.remote.base_url, before);
        assert!(cfg.remote.api_key.is_empty());
    }

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "project_id = \"derby\"\n[batch]\nimage_window = 2\n").unwrap();
        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.project_id, "derby");
        assert_eq!(cfg.batch.image_window, 2);
        assert_eq!(cfg.batch.speech_window, 1);
    }

    #[test]
    fn data_dir_prefers_config() {
        let mut cfg = AppConfig::default();
        cfg.autosave.data_dir = Some("/tmp/castforge-test".into());
        assert_eq!(
            resolve_data_dir(&cfg).unwrap(),
            PathBuf::from("/tmp/castforge-test")
        );
    }
}
