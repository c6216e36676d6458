//! Pipeline stages, the single-writer state they feed, and its persistence.

mod autosave;
mod stage;
mod state;
mod store;

pub use autosave::{AutoSaver, DEFAULT_QUIET_PERIOD};
pub use stage::Stage;
pub use state::{
    Applied, AssetKind, AudioTrack, Mutation, PersonaId, PipelineState, Rejected, VisualAsset,
};
pub use store::{MemoryStore, PersistedRecord, PersistenceStore};
