use anyhow::Result;
use common::{Config, Notification};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, info};
use std::io::{self, Write};
use std::time::{Duration, Instant};
use ztna_engine::{SimulatorHandle, Snapshot};

use crate::render::{render_screen, Frame, Tab};

/// Transient UI state of the simulator view. Never touches the feed.
pub struct ViewState {
    pub tab: Tab,
    pub cursor: usize,
    notification: Option<(Notification, Instant)>,
    notification_ttl: Duration,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LiveAction {
    Exit,
    Approve(String),
    Deny(String),
    Select(String),
    None,
}

impl ViewState {
    pub fn new(notification_ttl: Duration) -> Self {
        ViewState {
            tab: Tab::Dashboard,
            cursor: 0,
            notification: None,
            notification_ttl,
        }
    }

    pub fn notify(&mut self, note: Notification) {
        self.notification = Some((note, Instant::now()));
    }

    pub fn current_notification(&mut self) -> Option<&Notification> {
        if let Some((_, shown_at)) = &self.notification {
            if shown_at.elapsed() >= self.notification_ttl {
                self.notification = None;
            }
        }
        self.notification.as_ref().map(|(note, _)| note)
    }

    fn switch_to(&mut self, tab: Tab) {
        if self.tab != tab {
            self.tab = tab;
            self.cursor = 0;
        }
    }

    fn rows(&self, snapshot: &Snapshot) -> usize {
        match self.tab {
            Tab::Access => snapshot.requests.len(),
            Tab::Network => snapshot.nodes.len(),
            _ => 0,
        }
    }

    /// Keeps the cursor on a real row as the feed grows and shrinks.
    pub fn clamp(&mut self, snapshot: &Snapshot) {
        self.cursor = self.cursor.min(self.rows(snapshot).saturating_sub(1));
    }

    /// Maps a key press to an action against the current snapshot.
    pub fn handle_key(&mut self, key: KeyEvent, snapshot: &Snapshot) -> LiveAction {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return LiveAction::Exit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return LiveAction::Exit,
            KeyCode::Tab => self.switch_to(self.tab.next()),
            KeyCode::Char(c @ '1'..='4') => {
                let index = c as usize - '1' as usize;
                self.switch_to(Tab::ALL[index]);
            }
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => {
                self.cursor = (self.cursor + 1).min(self.rows(snapshot).saturating_sub(1));
            }
            KeyCode::Char('a') if self.tab == Tab::Access => {
                if let Some(request) = snapshot.requests.get(self.cursor).filter(|r| r.is_pending()) {
                    return LiveAction::Approve(request.id.clone());
                }
            }
            KeyCode::Char('d') if self.tab == Tab::Access => {
                if let Some(request) = snapshot.requests.get(self.cursor).filter(|r| r.is_pending()) {
                    return LiveAction::Deny(request.id.clone());
                }
            }
            KeyCode::Enter if self.tab == Tab::Network => {
                if let Some(node) = snapshot.nodes.get(self.cursor) {
                    return LiveAction::Select(node.id.clone());
                }
            }
            _ => {}
        }
        LiveAction::None
    }
}

/// Mounts the simulator view: arms the feed, runs the TUI, disarms on exit.
pub async fn run_simulator(config: &Config) -> Result<()> {
    let mut handle = SimulatorHandle::start(&config.simulator)?;
    info!("Simulator view mounted");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let result = live_loop(&mut handle, config).await;

    execute!(stdout, Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;

    handle.stop().await?;
    info!("Simulator view unmounted");
    result
}

async fn live_loop(handle: &mut SimulatorHandle, config: &Config) -> Result<()> {
    let mut view = handle.subscribe();
    let mut state = ViewState::new(Duration::from_secs(config.ui.notification_secs));
    let poll = Duration::from_millis(config.ui.refresh_millis);

    loop {
        while let Some(note) = handle.try_notification() {
            state.notify(note);
        }

        let snapshot = view.borrow_and_update().clone();
        state.clamp(&snapshot);
        let frame = Frame {
            tab: state.tab,
            cursor: state.cursor,
            notification: state.current_notification(),
        };
        draw(&render_screen(&snapshot, &frame))?;

        // crossterm polling blocks, so keep it off the runtime threads
        let key = tokio::task::spawn_blocking(move || -> io::Result<Option<KeyEvent>> {
            if event::poll(poll)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        return Ok(Some(key));
                    }
                }
            }
            Ok(None)
        })
        .await??;

        let Some(key) = key else { continue };
        match state.handle_key(key, &snapshot) {
            LiveAction::Exit => break,
            LiveAction::Approve(id) => handle.approve(&id).await?,
            LiveAction::Deny(id) => handle.deny(&id).await?,
            LiveAction::Select(id) => handle.select_node(&id).await?,
            LiveAction::None => {}
        }
        debug!("key {:?} on {:?}", key.code, state.tab);
    }

    Ok(())
}

fn draw(screen: &str) -> Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;
    write!(stdout, "{}", screen)?;
    stdout.flush()?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::SimulatorConfig;
    use ztna_engine::Simulator;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn snapshot(ticks: usize) -> Snapshot {
        let config = SimulatorConfig { seed: Some(31), ..SimulatorConfig::default() };
        let mut sim = Simulator::from_config(&config);
        for _ in 0..ticks {
            sim.tick(Utc::now());
        }
        sim.snapshot()
    }

    #[test]
    fn test_number_keys_switch_tabs_and_reset_cursor() {
        let snap = snapshot(3);
        let mut state = ViewState::new(Duration::from_secs(3));
        state.handle_key(key(KeyCode::Char('3')), &snap);
        assert_eq!(state.tab, Tab::Access);
        state.handle_key(key(KeyCode::Down), &snap);
        assert_eq!(state.cursor, 1);

        state.handle_key(key(KeyCode::Tab), &snap);
        assert_eq!(state.tab, Tab::Events);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_cursor_stops_at_last_row() {
        let snap = snapshot(2);
        let mut state = ViewState::new(Duration::from_secs(3));
        state.handle_key(key(KeyCode::Char('3')), &snap);
        for _ in 0..5 {
            state.handle_key(key(KeyCode::Down), &snap);
        }
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_decisions_only_offered_for_pending_rows() {
        let mut snap = snapshot(2);
        let mut state = ViewState::new(Duration::from_secs(3));
        state.handle_key(key(KeyCode::Char('3')), &snap);

        let id = snap.requests[0].id.clone();
        assert_eq!(state.handle_key(key(KeyCode::Char('d')), &snap), LiveAction::Deny(id.clone()));
        assert_eq!(state.handle_key(key(KeyCode::Char('a')), &snap), LiveAction::Approve(id));

        snap.requests[0].status = common::RequestStatus::Denied;
        assert_eq!(state.handle_key(key(KeyCode::Char('a')), &snap), LiveAction::None);
    }

    #[test]
    fn test_decision_keys_ignored_outside_access_tab() {
        let snap = snapshot(2);
        let mut state = ViewState::new(Duration::from_secs(3));
        assert_eq!(state.handle_key(key(KeyCode::Char('a')), &snap), LiveAction::None);
    }

    #[test]
    fn test_enter_selects_node_under_cursor() {
        let snap = snapshot(0);
        let mut state = ViewState::new(Duration::from_secs(3));
        state.handle_key(key(KeyCode::Char('2')), &snap);
        state.handle_key(key(KeyCode::Down), &snap);
        assert_eq!(state.handle_key(key(KeyCode::Enter), &snap), LiveAction::Select("user2".to_string()));
    }

    #[test]
    fn test_exit_keys() {
        let snap = snapshot(0);
        let mut state = ViewState::new(Duration::from_secs(3));
        assert_eq!(state.handle_key(key(KeyCode::Esc), &snap), LiveAction::Exit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(state.handle_key(ctrl_c, &snap), LiveAction::Exit);
    }

    #[test]
    fn test_notification_expires() {
        let mut state = ViewState::new(Duration::ZERO);
        state.notify(Notification::for_decision(common::Decision::Denied));
        assert!(state.current_notification().is_none());

        let mut state = ViewState::new(Duration::from_secs(60));
        state.notify(Notification::for_decision(common::Decision::Denied));
        assert_eq!(state.current_notification().unwrap().title, "Access denied");
    }

    #[test]
    fn test_clamp_after_feed_shrinks_view() {
        let snap = snapshot(5);
        let mut state = ViewState::new(Duration::from_secs(3));
        state.handle_key(key(KeyCode::Char('3')), &snap);
        state.cursor = 9;
        state.clamp(&snap);
        assert_eq!(state.cursor, 4);
    }
}
