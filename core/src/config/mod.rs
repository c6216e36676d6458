mod load;
mod types;

pub use load::{
    apply_env_overrides, get_castforge_data_dir, load_default, load_from_path, resolve_data_dir,
};
pub use types::{
    AppConfig, AutosaveConfig, BatchConfig, LimitsConfig, LoggingConfig, ModelConfig, Persona,
    PolicyTable, PromptConfig, RemoteConfig,
};
