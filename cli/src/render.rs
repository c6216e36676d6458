//! Terminal rendering of session events: notifications are printed, batch
//! items drive a progress bar.
use std::future::Future;

use castforge_core::notify::StageStatus;
use castforge_core::pipeline::Stage;
use castforge_core::{EventBus, Notification, NotificationKind, SessionEvent};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast::{self, error::TryRecvError};

pub struct Renderer {
    rx: broadcast::Receiver<SessionEvent>,
    bar: Option<(Stage, ProgressBar)>,
    show_progress: bool,
}

impl Renderer {
    pub fn new(events: &EventBus, show_progress: bool) -> Self {
        Self {
            rx: events.subscribe(),
            bar: None,
            show_progress,
        }
    }

    /// Poll `fut` to completion while rendering the events it emits, then
    /// drain whatever is still queued.
    pub async fn drive<F: Future>(&mut self, fut: F) -> F::Output {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                out = &mut fut => {
                    self.drain();
                    self.finish_bar();
                    return out;
                }
                event = self.rx.recv() => match event {
                    Ok(event) => self.render(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(target: "castforge.cli", skipped, "renderer lagged");
                    }
                    // The bus outlives every command; a closed channel only
                    // happens on teardown.
                    Err(broadcast::error::RecvError::Closed) => {
                        let out = fut.await;
                        self.finish_bar();
                        return out;
                    }
                },
            }
        }
    }

    pub fn drain(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.render(&event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn render(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Notification { notification, .. } => self.print(&format_notification(notification)),
            SessionEvent::Progress { stage, message, .. } => {
                self.print(&format!("  [{}] {}...", stage.id(), message));
            }
            SessionEvent::StageChanged { stage, status, .. } => {
                if *status == StageStatus::Entered {
                    tracing::debug!(target: "castforge.cli", stage = stage.id(), "entered");
                }
            }
            SessionEvent::RetryScheduled {
                operation,
                attempt,
                reason,
                ..
            } => {
                self.print(&format!("  retrying {operation} (attempt {attempt}): {reason}"));
            }
            SessionEvent::ItemSettled {
                stage, total, success, ..
            } => self.advance(*stage, *total, *success),
        }
    }

    fn advance(&mut self, stage: Stage, total: usize, success: bool) {
        if !self.show_progress {
            return;
        }
        let stale = !matches!(&self.bar, Some((s, _)) if *s == stage);
        if stale {
            self.finish_bar();
            let bar = ProgressBar::new(total as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:30.cyan/blue} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓▒░  "),
            );
            bar.set_message(stage.label());
            self.bar = Some((stage, bar));
        }
        if let Some((_, bar)) = &self.bar {
            if !success {
                bar.set_message(format!("{} (with failures)", stage.label()));
            }
            bar.inc(1);
            if bar.position() >= bar.length().unwrap_or(0) {
                self.finish_bar();
            }
        }
    }

    fn finish_bar(&mut self) {
        if let Some((_, bar)) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn print(&self, line: &str) {
        match &self.bar {
            Some((_, bar)) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

pub fn format_notification(notification: &Notification) -> String {
    let icon = match notification.kind {
        NotificationKind::Success => "✅",
        NotificationKind::Error => "❌",
        NotificationKind::Info => "ℹ️",
        NotificationKind::Warning => "⚠️",
    };
    format!("{icon} {}", notification.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_lines_carry_kind_icon() {
        let line = format_notification(&Notification::new(NotificationKind::Error, "Image failed"));
        assert_eq!(line, "❌ Image failed");
    }

    #[tokio::test]
    async fn drive_returns_the_future_output_and_drains() {
        let bus = EventBus::default();
        let mut renderer = Renderer::new(&bus, false);
        let emitter = bus.clone();
        let out = renderer
            .drive(async move {
                emitter.info("working");
                emitter.item_settled(Stage::Visuals, 0, 2, true);
                emitter.item_settled(Stage::Visuals, 1, 2, false);
                42
            })
            .await;
        assert_eq!(out, 42);
        assert!(matches!(renderer.rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn progress_bar_closes_when_all_items_settle() {
        let bus = EventBus::default();
        let mut renderer = Renderer::new(&bus, true);
        renderer.advance(Stage::CardNews, 2, true);
        assert!(renderer.bar.is_some());
        renderer.advance(Stage::CardNews, 2, false);
        assert!(renderer.bar.is_none());
    }
}
