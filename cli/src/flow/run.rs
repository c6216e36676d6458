//! One-shot run: every stage in order, then export.
use castforge_core::error::CliError;
use castforge_core::pipeline::Stage;
use castforge_core::{ResearchBrief, SessionController};

use crate::commands::cli::RunArgs;
use crate::export;
use crate::render::Renderer;

/// Exit code when a stage after scripting failed but the run completed.
pub const PARTIAL_FAILURE_EXIT: i32 = 30;

pub async fn run_pipeline_flow(
    args: RunArgs,
    mut session: SessionController,
    mut renderer: Renderer,
) -> Result<i32, CliError> {
    let raw_data = match &args.raw_data {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => String::new(),
    };
    let brief = ResearchBrief {
        topic: args.topic.clone(),
        instructions: args.instructions.clone(),
        raw_data,
        analyze_news: args.news,
    };

    // Autosave is off for one-shot runs, so a saved record stays untouched.
    if renderer.drive(session.start()).await?.is_some() {
        tracing::info!(target: "castforge.cli", "saved work found; left for the next session");
    }

    let outcome = run_stages(&args, brief, &mut session, &mut renderer).await;

    let stamp = export::timestamp();
    let exported = match &outcome {
        Ok(Stages { deck, .. }) => export::export_session(&session, &args.out, &stamp).and_then(|mut files| {
            if let Some(deck) = deck {
                files.extend(export::export_deck(deck, &args.out, &stamp)?);
            }
            Ok(files)
        }),
        Err(_) => Ok(Vec::new()),
    };
    renderer.drive(session.shutdown()).await;

    let stages = outcome?;
    let files = exported?;
    println!("Exported {} files to {}", files.len(), args.out.display());
    Ok(if stages.failed.is_empty() {
        0
    } else {
        eprintln!("stages with failures: {}", stages.failed.join(", "));
        PARTIAL_FAILURE_EXIT
    })
}

struct Stages {
    deck: Option<castforge_core::session::CardDeck>,
    failed: Vec<&'static str>,
}

/// Research and scripting are required; later stages record failure and
/// the run continues.
async fn run_stages(
    args: &RunArgs,
    brief: ResearchBrief,
    session: &mut SessionController,
    renderer: &mut Renderer,
) -> Result<Stages, CliError> {
    let mut failed = Vec::new();

    renderer.drive(session.run_research(brief)).await?;
    session.enter_stage(Stage::Scripting);
    renderer.drive(session.generate_script()).await?;
    if args.optimize {
        renderer.drive(session.optimize_script()).await?;
    }

    if !args.skip_audio {
        match renderer.drive(session.generate_audio()).await {
            Ok(report) if report.failed.is_empty() && report.conversation => {}
            _ => failed.push("audio"),
        }
    }

    if !args.skip_visuals {
        session.enter_stage(Stage::Visuals);
        match renderer.drive(session.generate_visuals()).await {
            Ok(report) if report.failed.is_empty() => {}
            _ => failed.push("visuals"),
        }
    }

    session.enter_stage(Stage::Video);
    renderer.drain();
    super::session::print_composition(session);

    let mut deck = None;
    if !args.skip_cards {
        session.enter_stage(Stage::CardNews);
        match renderer.drive(session.generate_card_news()).await {
            Ok(cards) => {
                if cards.failed_count() > 0 {
                    failed.push("cards");
                }
                deck = Some(cards);
            }
            Err(_) => failed.push("cards"),
        }
    }

    Ok(Stages { deck, failed })
}
