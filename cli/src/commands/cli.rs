use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "castforge", version, about = "Sports analysis podcast production")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Read configuration from this file instead of the default locations.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable debounced autosave for this invocation.
    #[arg(long, global = true, default_value_t = false)]
    pub no_autosave: bool,

    /// Hide progress bars (notifications are still printed).
    #[arg(long, global = true, default_value_t = false)]
    pub quiet: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[arg(long)]
    pub topic: String,

    #[arg(long, default_value = "")]
    pub instructions: String,

    /// File holding raw statistics to analyze.
    #[arg(long)]
    pub raw_data: Option<PathBuf>,

    /// Ground the research on news from the two weeks before the game.
    #[arg(long, default_value_t = false)]
    pub news: bool,

    /// Run the TTS-direction pass over the script before audio.
    #[arg(long, default_value_t = false)]
    pub optimize: bool,

    #[arg(long, default_value_t = false)]
    pub skip_audio: bool,

    #[arg(long, default_value_t = false)]
    pub skip_visuals: bool,

    #[arg(long, default_value_t = false)]
    pub skip_cards: bool,

    /// Directory receiving the exported artefacts.
    #[arg(long, default_value = "castforge-out")]
    pub out: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive session (default).
    Session,
    /// Run every stage once and export the results.
    Run(RunArgs),
    /// Delete the saved autosave record.
    Discard,
}
