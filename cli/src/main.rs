use clap::Parser;
use castforge_cli::commands::cli;
use castforge_cli::render::Renderer;
use castforge_cli::{app, flow};
use castforge_core::error::{self, SessionError};
use castforge_core::pipeline::PersistenceStore;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let mut args = cli::Args::parse();
    let cfg = app::load_config(&args)?;
    init_tracing(&cfg.logging).map_err(error::CliError::Command)?;

    let cmd = args.command.take().unwrap_or(cli::Commands::Session);

    // Discarding only needs the store, not a backend or API key.
    if let cli::Commands::Discard = cmd {
        let store = castforge_plugins::factory::build_store(&cfg)?;
        store.delete().await.map_err(SessionError::from)?;
        println!("Saved work discarded.");
        return Ok(0);
    }

    let ctx = app::build_session(cfg)?;
    let renderer = Renderer::new(&ctx.events, !args.quiet);

    match cmd {
        cli::Commands::Run(run_args) => {
            flow::run::run_pipeline_flow(run_args, ctx.session, renderer).await
        }
        cli::Commands::Session | cli::Commands::Discard => {
            flow::session::run_session_flow(ctx.session, renderer).await
        }
    }
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 11: config error
    // 20: IO error
    // 30: generation failure
    // 50: internal/uncategorized
    match e {
        error::CliError::Config(_) => 11,
        error::CliError::Io(_) => 20,
        error::CliError::Command(_) => 20,
        error::CliError::Session(se) => match se {
            SessionError::Store(_) | SessionError::Handle(_) => 20,
            SessionError::Generation(_) | SessionError::UnknownPersona(_) => 30,
            SessionError::Encode(_) => 50,
        },
        error::CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &castforge_core::config::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("castforge"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("castforge.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
