//! Interactive line-oriented session. Each line is one command; the
//! controller reports progress and failures through notifications, so the
//! loop itself only prints results.
use std::path::PathBuf;

use castforge_core::error::CliError;
use castforge_core::pipeline::Stage;
use castforge_core::session::{CardDeck, RestoreOffer, SessionStatus};
use castforge_core::{ResearchBrief, SessionController};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::export;
use crate::render::Renderer;

const HELP: &str = "\
Inputs:    topic <text> | instructions <text> | raw <file> | news on|off
Planning:  research
Script:    script | optimize | edit <file> | audio | voice <persona> | conversation
Visuals:   visuals | clear-visuals
Video:     video
Cards:     cards
Other:     stage <name> | status | export <dir> | reset | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Topic(String),
    Instructions(String),
    RawData(PathBuf),
    News(bool),
    Research,
    Script,
    Optimize,
    Edit(PathBuf),
    Audio,
    Voice(String),
    Conversation,
    Visuals,
    ClearVisuals,
    Video,
    Stage(Stage),
    Cards,
    Status,
    Export(PathBuf),
    Reset,
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let needs_arg = |what: &str| {
        if rest.is_empty() {
            Err(format!("{word} needs {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    let cmd = match word.to_ascii_lowercase().as_str() {
        "topic" => ReplCommand::Topic(needs_arg("a topic")?),
        "instructions" => ReplCommand::Instructions(rest.to_string()),
        "raw" => ReplCommand::RawData(PathBuf::from(needs_arg("a file")?)),
        "news" => match rest {
            "on" | "yes" | "true" => ReplCommand::News(true),
            "off" | "no" | "false" => ReplCommand::News(false),
            _ => return Err("news takes on|off".to_string()),
        },
        "research" => ReplCommand::Research,
        "script" => ReplCommand::Script,
        "optimize" => ReplCommand::Optimize,
        "edit" => ReplCommand::Edit(PathBuf::from(needs_arg("a file")?)),
        "audio" => ReplCommand::Audio,
        "voice" => ReplCommand::Voice(needs_arg("a persona id")?),
        "conversation" => ReplCommand::Conversation,
        "visuals" => ReplCommand::Visuals,
        "clear-visuals" => ReplCommand::ClearVisuals,
        "video" => ReplCommand::Video,
        "stage" => ReplCommand::Stage(needs_arg("a stage name")?.parse::<Stage>()?),
        "cards" => ReplCommand::Cards,
        "status" => ReplCommand::Status,
        "export" => ReplCommand::Export(PathBuf::from(if rest.is_empty() { "." } else { rest })),
        "reset" => ReplCommand::Reset,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(format!("unknown command '{other}', try help")),
    };
    Ok(Some(cmd))
}

struct Repl {
    session: SessionController,
    renderer: Renderer,
    brief: ResearchBrief,
    deck: Option<CardDeck>,
    lines: Lines<BufReader<Stdin>>,
}

pub async fn run_session_flow(
    session: SessionController,
    renderer: Renderer,
) -> Result<i32, CliError> {
    let mut repl = Repl {
        session,
        renderer,
        brief: ResearchBrief::default(),
        deck: None,
        lines: BufReader::new(tokio::io::stdin()).lines(),
    };

    let offer = repl.renderer.drive(repl.session.start()).await?;
    if let Some(offer) = offer {
        repl.offer_restore(offer).await?;
    }
    println!("castforge session. Type 'help' for commands.");

    loop {
        prompt(repl.session.current_stage());
        let Some(line) = repl.lines.next_line().await? else {
            break;
        };
        match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(ReplCommand::Quit)) => break,
            Ok(Some(cmd)) => repl.execute(cmd).await?,
            Err(msg) => println!("{msg}"),
        }
    }

    let Repl {
        session, mut renderer, ..
    } = repl;
    renderer.drive(session.shutdown()).await;
    Ok(0)
}

fn prompt(stage: Stage) {
    use std::io::Write;
    print!("[{}] > ", stage.id());
    let _ = std::io::stdout().flush();
}

impl Repl {
    async fn offer_restore(&mut self, offer: RestoreOffer) -> Result<(), CliError> {
        let minutes = offer.record.minutes_since(Utc::now());
        println!(
            "Found work saved {minutes} minutes ago (research {} chars, script {} chars, {} keywords).",
            offer.record.research_text.chars().count(),
            offer.record.script_text.chars().count(),
            offer.record.keywords.len()
        );
        print!("Restore it? [r]estore / [d]iscard / [k]eep for later: ");
        let _ = std::io::Write::flush(&mut std::io::stdout());
        let answer = self.lines.next_line().await?.unwrap_or_default();
        match answer.trim().to_ascii_lowercase().as_str() {
            "r" | "restore" | "y" | "yes" => {
                let report = self.session.restore(offer);
                self.renderer.drain();
                if let Ok(report) = report {
                    tracing::info!(target: "castforge.cli", minutes_ago = report.minutes_ago, "restored");
                }
            }
            "d" | "discard" => {
                let _ = self.renderer.drive(self.session.discard_restore()).await;
            }
            _ => println!("Saved work left untouched."),
        }
        Ok(())
    }

    async fn execute(&mut self, cmd: ReplCommand) -> Result<(), CliError> {
        let session = &mut self.session;
        let renderer = &mut self.renderer;
        // Failures were already reported as notifications by the controller.
        match cmd {
            ReplCommand::Topic(topic) => self.brief.topic = topic,
            ReplCommand::Instructions(text) => self.brief.instructions = text,
            ReplCommand::RawData(path) => match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    println!("Loaded {} chars of raw data", text.chars().count());
                    self.brief.raw_data = text;
                }
                Err(e) => println!("cannot read {}: {e}", path.display()),
            },
            ReplCommand::News(on) => self.brief.analyze_news = on,
            ReplCommand::Research => {
                if let Ok(report) = renderer.drive(session.run_research(self.brief.clone())).await {
                    println!("{}", report.text);
                    for source in &report.sources {
                        println!("  - {} <{}>", source.title, source.uri);
                    }
                }
            }
            ReplCommand::Script => {
                if let Ok(script) = renderer.drive(session.generate_script()).await {
                    println!("{script}");
                }
            }
            ReplCommand::Optimize => {
                if let Ok(script) = renderer.drive(session.optimize_script()).await {
                    println!("{script}");
                }
            }
            ReplCommand::Edit(path) => match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    let _ = session.edit_script(text);
                    renderer.drain();
                }
                Err(e) => println!("cannot read {}: {e}", path.display()),
            },
            ReplCommand::Audio => {
                if let Ok(report) = renderer.drive(session.generate_audio()).await {
                    println!(
                        "conversation: {}, persona tracks: {:?}, failed: {:?}",
                        report.conversation, report.generated, report.failed
                    );
                }
            }
            ReplCommand::Voice(persona) => {
                let _ = renderer.drive(session.generate_persona_voice(&persona)).await;
            }
            ReplCommand::Conversation => {
                let _ = renderer.drive(session.generate_conversation()).await;
            }
            ReplCommand::Visuals => {
                if let Ok(report) = renderer.drive(session.generate_visuals()).await {
                    println!("keywords: {}", report.keywords.join(", "));
                }
            }
            ReplCommand::ClearVisuals => {
                if let Ok(n) = session.clear_visuals() {
                    println!("Removed {n} visual assets");
                }
                renderer.drain();
            }
            ReplCommand::Video => {
                session.enter_stage(Stage::Video);
                renderer.drain();
                print_composition(session);
            }
            ReplCommand::Stage(stage) => {
                session.enter_stage(stage);
                renderer.drain();
            }
            ReplCommand::Cards => {
                if let Ok(deck) = renderer.drive(session.generate_card_news()).await {
                    for (i, card) in deck.cards.iter().enumerate() {
                        let flag = if card.generation_failed { " (placeholder)" } else { "" };
                        println!("{:>2}. {}{flag}\n    {}", i + 1, card.title, card.content);
                    }
                    self.deck = Some(deck);
                }
            }
            ReplCommand::Status => print_status(&session.status()),
            ReplCommand::Export(dir) => {
                let stamp = export::timestamp();
                let mut written = export::export_session(session, &dir, &stamp)?;
                if let Some(deck) = &self.deck {
                    written.extend(export::export_deck(deck, &dir, &stamp)?);
                }
                for path in &written {
                    println!("  {}", path.display());
                }
                println!("Exported {} files to {}", written.len(), dir.display());
            }
            ReplCommand::Reset => {
                self.brief = ResearchBrief::default();
                self.deck = None;
                let _ = renderer.drive(session.reset()).await;
            }
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => {}
        }
        Ok(())
    }
}

pub(crate) fn print_composition(session: &SessionController) {
    let video = session.compose_video();
    if video.is_empty() {
        println!("Nothing to compose yet: generate audio or visuals first.");
        return;
    }
    if let Some(track) = &video.conversation {
        println!("conversation  {:?}", track.duration.unwrap_or_default());
    }
    for track in &video.tracks {
        println!(
            "voice {:<10} {:?}",
            track.persona.as_deref().unwrap_or("-"),
            track.duration.unwrap_or_default()
        );
    }
    for asset in &video.assets {
        println!("{:<24} {}", asset.id, asset.prompt);
    }
}

fn print_status(status: &SessionStatus) {
    println!("stage:          {}", status.stage.label());
    println!("research:       {} chars", status.research_chars);
    println!("script:         {} chars", status.script_chars);
    println!("keywords:       {}", status.keywords.join(", "));
    println!("conversation:   {}", if status.conversation { "yes" } else { "no" });
    println!("voice tracks:   {:?}", status.audio_tracks);
    println!("visual assets:  {}", status.visual_assets);
    match status.last_persisted_at {
        Some(at) => println!("last autosave:  {}", at.to_rfc3339()),
        None => println!("last autosave:  never"),
    }
}
