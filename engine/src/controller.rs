use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use common::{Decision, Notification, SimulatorConfig, MAX_TICK_INTERVAL_SECS};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::feed::Draw;
use crate::simulator::{Simulator, Snapshot};

const COMMAND_CAPACITY: usize = 32;
const NOTIFICATION_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum Command {
    #[serde(rename = "decide")]
    Decide {
        request_id: String,
        decision: Decision,
        #[serde(default)]
        reason: Option<String>,
    },
    #[serde(rename = "select_node")]
    SelectNode { node_id: String },
    /// Fire one tick right away, outside the timer.
    #[serde(rename = "tick")]
    Tick,
}

/// Owner-side handle of a running simulator.
///
/// The feed is armed by [`SimulatorHandle::start`] and disarmed by
/// [`SimulatorHandle::stop`]. Dropping the handle aborts the task as well.
pub struct SimulatorHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<Snapshot>,
    notifications: mpsc::Receiver<Notification>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SimulatorHandle {
    pub fn start(config: &SimulatorConfig) -> Result<Self> {
        config.validate()?;
        Self::spawn(Simulator::from_config(config), config.tick_interval())
    }

    /// Spawns the feed task. `period` must be non-zero and at most
    /// [`MAX_TICK_INTERVAL_SECS`].
    pub fn spawn<D>(simulator: Simulator<D>, period: Duration) -> Result<Self>
    where
        D: Draw + Send + 'static,
    {
        if period.is_zero() || period > Duration::from_secs(MAX_TICK_INTERVAL_SECS) {
            bail!("tick period {:?} out of range", period);
        }
        let first_tick = Instant::now()
            .checked_add(period)
            .ok_or_else(|| anyhow!("tick period {:?} overflows the clock", period))?;

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (view_tx, view_rx) = watch::channel(simulator.snapshot());
        let (note_tx, note_rx) = mpsc::channel(NOTIFICATION_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!("Starting simulator feed with {:?} tick period", period);
        let task = tokio::spawn(run_feed(simulator, first_tick, period, cmd_rx, view_tx, note_tx, shutdown_rx));

        Ok(Self {
            commands: cmd_tx,
            view: view_rx,
            notifications: note_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("simulator is not running"))
    }

    pub async fn decide(&self, request_id: &str, decision: Decision, reason: Option<String>) -> Result<()> {
        self.send(Command::Decide {
            request_id: request_id.to_string(),
            decision,
            reason,
        })
        .await
    }

    pub async fn approve(&self, request_id: &str) -> Result<()> {
        self.decide(request_id, Decision::Approved, None).await
    }

    pub async fn deny(&self, request_id: &str) -> Result<()> {
        self.decide(request_id, Decision::Denied, None).await
    }

    pub async fn select_node(&self, node_id: &str) -> Result<()> {
        self.send(Command::SelectNode { node_id: node_id.to_string() }).await
    }

    /// A fresh read-only subscription to snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.view.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.view.borrow().clone()
    }

    pub fn try_notification(&mut self) -> Option<Notification> {
        self.notifications.try_recv().ok()
    }

    pub async fn next_notification(&mut self) -> Option<Notification> {
        self.notifications.recv().await
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    /// Disarms the timer and waits for the feed task to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.await?;
        }
        info!("Simulator feed stopped");
        Ok(())
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_feed<D: Draw>(
    mut simulator: Simulator<D>,
    first_tick: Instant,
    period: Duration,
    mut commands: mpsc::Receiver<Command>,
    view: watch::Sender<Snapshot>,
    notifications: mpsc::Sender<Notification>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                simulator.tick(Utc::now());
            }
            command = commands.recv() => {
                let Some(command) = command else { break };
                if let Some(note) = apply(&mut simulator, command) {
                    if notifications.try_send(note).is_err() {
                        warn!("Notification dropped, no reader keeping up");
                    }
                }
            }
        }
        view.send_replace(simulator.snapshot());
    }

    debug!("Feed loop exited after {} ticks", simulator.ticks());
}

fn apply<D: Draw>(simulator: &mut Simulator<D>, command: Command) -> Option<Notification> {
    match command {
        Command::Decide { request_id, decision, reason } => simulator.decide(&request_id, decision, reason),
        Command::SelectNode { node_id } => {
            simulator.select_node(&node_id);
            None
        }
        Command::Tick => {
            simulator.tick(Utc::now());
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ScriptedDraw;
    use common::{NotificationStyle, RequestStatus};

    const PERIOD: Duration = Duration::from_secs(3);

    fn scripted_handle() -> SimulatorHandle {
        let draw = ScriptedDraw::new(&[1, 1, 1], &[55], &[false]);
        SimulatorHandle::spawn(Simulator::new(draw, &SimulatorConfig::default()), PERIOD).unwrap()
    }

    #[test]
    fn test_command_wire_format() {
        let cmd: Command = serde_json::from_str(
            r#"{"method":"decide","request_id":"req-000001","decision":"denied"}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::Decide {
                request_id: "req-000001".to_string(),
                decision: Decision::Denied,
                reason: None,
            }
        );
        let tick = serde_json::to_string(&Command::Tick).unwrap();
        assert_eq!(tick, r#"{"method":"tick"}"#);
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_periods() {
        let sim = || Simulator::new(ScriptedDraw::default(), &SimulatorConfig::default());
        assert!(SimulatorHandle::spawn(sim(), Duration::ZERO).is_err());
        assert!(SimulatorHandle::spawn(sim(), Duration::from_secs(MAX_TICK_INTERVAL_SECS + 1)).is_err());
        assert!(SimulatorHandle::spawn(sim(), Duration::MAX).is_err());

        let config = SimulatorConfig { tick_interval_secs: u64::MAX, ..SimulatorConfig::default() };
        assert!(SimulatorHandle::start(&config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let handle = scripted_handle();
        let mut view = handle.subscribe();
        let started = Instant::now();

        view.changed().await.unwrap();
        assert!(started.elapsed() >= PERIOD);

        let snapshot = view.borrow_and_update().clone();
        assert_eq!(snapshot.ticks, 1);
        let first = &snapshot.requests[0];
        assert_eq!(first.user, "Jane Smith");
        assert_eq!(first.resource, "File Server");
        assert_eq!(first.location, "London");
        assert_eq!(first.risk_score, 55);
        assert_eq!(first.status, RequestStatus::Pending);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_keep_firing_until_stopped() {
        let handle = scripted_handle();
        let mut view = handle.subscribe();
        for _ in 0..12 {
            view.changed().await.unwrap();
        }
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.ticks, 12);
        assert_eq!(snapshot.requests.len(), 10);

        handle.stop().await.unwrap();
        assert!(view.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_decide_through_handle() {
        let mut handle = scripted_handle();
        handle.send(Command::Tick).await.unwrap();
        let mut view = handle.subscribe();
        view.changed().await.unwrap();
        let id = view.borrow_and_update().requests[0].id.clone();

        handle.deny(&id).await.unwrap();
        let note = handle.next_notification().await.unwrap();
        assert_eq!(note.title, "Access denied");
        assert_eq!(note.style, NotificationStyle::Alert);

        let request = handle.snapshot().request(&id).cloned().unwrap();
        assert_eq!(request.status, RequestStatus::Denied);
        assert_eq!(request.reason.as_deref(), Some("Policy violation"));

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_decision_sends_no_notification() {
        let mut handle = scripted_handle();
        let mut view = handle.subscribe();
        handle.approve("req-424242").await.unwrap();
        view.changed().await.unwrap();

        assert!(handle.try_notification().is_none());
        assert!(handle.snapshot().requests.is_empty());
        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_node_through_handle() {
        let handle = scripted_handle();
        let mut view = handle.subscribe();

        handle.select_node("user2").await.unwrap();
        handle.select_node("server1").await.unwrap();
        view.changed().await.unwrap();
        while view.borrow_and_update().selected_node.as_deref() != Some("server1") {
            view.changed().await.unwrap();
        }
        assert_eq!(handle.snapshot().selected().unwrap().name, "File Server");
        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_feed() {
        let handle = scripted_handle();
        let mut view = handle.subscribe();
        assert!(handle.is_running());
        drop(handle);

        assert!(view.changed().await.is_err());
    }
}
