//! Live user-count dashboard.

use std::time::Instant;

use anyhow::Result;
use crossterm::event::KeyCode;
use prism_models::UserCounts;
use prism_sdk::{StreamEndpoints, StreamSession, Subscription};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tracing::info;

use crate::tui::{self, Action, EventHandler};

const TICK_RATE: std::time::Duration = std::time::Duration::from_millis(250);

/// Folded state of the user-count stream.
#[derive(Debug, Default)]
pub struct Dashboard {
    counts: Option<UserCounts>,
    updates: u64,
    last_update: Option<Instant>,
    stream_ended: bool,
    should_quit: bool,
}

impl Dashboard {
    pub fn update(&mut self, action: Action) {
        match action {
            Action::Counts(counts) => {
                self.counts = Some(counts);
                self.updates += 1;
                self.last_update = Some(Instant::now());
            }
            Action::StreamEnded => self.stream_ended = true,
            Action::Key(key) => {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    self.should_quit = true;
                }
            }
            Action::Tick | Action::Resize(..) => {}
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn counts(&self) -> Option<UserCounts> {
        self.counts
    }

    fn status_line(&self) -> String {
        if self.stream_ended {
            return "stream ended, restart to reconnect".to_string();
        }
        match self.last_update {
            Some(at) => format!(
                "{} updates, last {}s ago",
                self.updates,
                at.elapsed().as_secs()
            ),
            None => "waiting for first update…".to_string(),
        }
    }

    pub fn render(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());

        let counters = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(34),
                Constraint::Percentage(33),
                Constraint::Percentage(33),
            ])
            .split(chunks[0]);

        let counts = self.counts.unwrap_or_default();
        let tiles = [
            ("Total", counts.total(), Color::Cyan),
            ("Authenticated", counts.authenticated_user_count, Color::Green),
            ("Anonymous", counts.anonymous_user_count, Color::Yellow),
        ];
        for ((title, value, color), area) in tiles.into_iter().zip(counters.iter()) {
            let text = if self.counts.is_some() {
                value.to_string()
            } else {
                "-".to_string()
            };
            let tile = Paragraph::new(Line::from(Span::styled(
                text,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(tile, *area);
        }

        let status = Paragraph::new(self.status_line())
            .block(Block::default().borders(Borders::ALL).title("Live users [q to quit]"));
        f.render_widget(status, chunks[1]);
    }
}

/// Subscribe to user counts and render them until `q`/`Esc`, then close
/// the session.
pub async fn run(mut session: StreamSession, plain: bool) -> Result<()> {
    let subscription = session
        .subscribe::<UserCounts>(&StreamEndpoints::user_counts())
        .await?;

    let outcome = if plain {
        run_plain(subscription).await
    } else {
        run_tui(subscription).await
    };

    session.close().await;
    outcome
}

async fn run_plain(mut subscription: Subscription<UserCounts>) -> Result<()> {
    println!("Listening on {} (Ctrl-C to stop)", subscription.endpoint());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            next = subscription.next() => match next {
                Some(c) => println!(
                    "[{}] total={} authenticated={} anonymous={}",
                    chrono::Local::now().format("%H:%M:%S"),
                    c.total(),
                    c.authenticated_user_count,
                    c.anonymous_user_count
                ),
                None => break,
            },
        }
    }
    Ok(())
}

async fn run_tui(mut subscription: Subscription<UserCounts>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    let tx = events.sender();
    let forwarder = tokio::spawn(async move {
        while let Some(counts) = subscription.next().await {
            if tx.send(Action::Counts(counts)).is_err() {
                return;
            }
        }
        let _ = tx.send(Action::StreamEnded);
    });

    let mut terminal = tui::init()?;
    let mut dashboard = Dashboard::default();
    let result = async {
        loop {
            terminal.draw(|f| dashboard.render(f))?;
            let Some(action) = events.next().await else {
                break;
            };
            dashboard.update(action);
            if dashboard.should_quit() {
                break;
            }
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    forwarder.abort();
    info!(updates = dashboard.updates, "dashboard closed");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};

    fn counts(auth: u64, anon: u64) -> UserCounts {
        UserCounts {
            authenticated_user_count: auth,
            anonymous_user_count: anon,
        }
    }

    #[test]
    fn folds_latest_counts() {
        let mut d = Dashboard::default();
        d.update(Action::Counts(counts(1, 2)));
        d.update(Action::Counts(counts(4, 5)));
        assert_eq!(d.counts(), Some(counts(4, 5)));
        assert_eq!(d.updates, 2);
    }

    #[test]
    fn quits_on_q_and_esc() {
        for code in [KeyCode::Char('q'), KeyCode::Esc] {
            let mut d = Dashboard::default();
            d.update(Action::Key(KeyEvent::new(code, KeyModifiers::NONE)));
            assert!(d.should_quit());
        }
        let mut d = Dashboard::default();
        d.update(Action::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)));
        assert!(!d.should_quit());
    }

    #[test]
    fn renders_totals() {
        let mut d = Dashboard::default();
        d.update(Action::Counts(counts(3, 4)));
        let mut terminal = Terminal::new(TestBackend::new(60, 10)).unwrap();
        terminal.draw(|f| d.render(f)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("Total"));
        assert!(screen.contains('7'));
    }
}
