//! Simulator state: the two bounded feeds, the seed topology and the
//! current node selection, plus the operations that change them.

use chrono::{DateTime, Utc};
use common::{AccessRequest, Decision, NetworkNode, Notification, SecurityEvent, SimulatorConfig};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::feed::{Draw, FeedGenerator, RandomDraw};
use crate::recent::Recent;
use crate::topology::{NodeDetails, Topology};

pub const DEFAULT_DENY_REASON: &str = "Policy violation";

/// What a single tick produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub request: AccessRequest,
    pub event: Option<SecurityEvent>,
}

/// Read-only projection handed to display code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub ticks: u64,
    pub requests: Vec<AccessRequest>,
    pub events: Vec<SecurityEvent>,
    pub nodes: Vec<NetworkNode>,
    pub selected_node: Option<String>,
}

impl Snapshot {
    pub fn selected(&self) -> Option<&NetworkNode> {
        let id = self.selected_node.as_deref()?;
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn selected_details(&self) -> Option<NodeDetails> {
        self.selected().map(NodeDetails::from)
    }

    pub fn request(&self, id: &str) -> Option<&AccessRequest> {
        self.requests.iter().find(|r| r.id == id)
    }
}

pub struct Simulator<D> {
    feed: FeedGenerator<D>,
    requests: Recent<AccessRequest>,
    events: Recent<SecurityEvent>,
    topology: Topology,
    selected_node: Option<String>,
    ticks: u64,
}

impl Simulator<RandomDraw<rand::rngs::StdRng>> {
    pub fn from_config(config: &SimulatorConfig) -> Self {
        Simulator::new(RandomDraw::seeded(config.seed), config)
    }
}

impl<D: Draw> Simulator<D> {
    pub fn new(draw: D, config: &SimulatorConfig) -> Self {
        Self {
            feed: FeedGenerator::new(draw, config.event_probability),
            requests: Recent::new(config.capacity),
            events: Recent::new(config.capacity),
            topology: Topology::seed(),
            selected_node: None,
            ticks: 0,
        }
    }

    /// One generator firing: always a request, sometimes an event.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        self.ticks += 1;

        let request = self.feed.next_request(now);
        debug!("tick {}: request {} from {} (risk {})", self.ticks, request.id, request.user, request.risk_score);
        if let Some(evicted) = self.requests.push(request.clone()) {
            debug!("request {} evicted", evicted.id);
        }

        let event = self.feed.maybe_event(now);
        if let Some(ref event) = event {
            info!("security event {}: {} ({})", event.id, event.message, event.severity);
            self.events.push(event.clone());
        }

        TickOutcome { request, event }
    }

    /// Applies `decision` to the request with `request_id`.
    ///
    /// Denials without a reason get [`DEFAULT_DENY_REASON`]. Returns `None`
    /// and leaves everything untouched when no such request is held.
    pub fn decide(&mut self, request_id: &str, decision: Decision, reason: Option<String>) -> Option<Notification> {
        let reason = match decision {
            Decision::Denied => reason.or_else(|| Some(DEFAULT_DENY_REASON.to_string())),
            Decision::Approved => reason,
        };

        let Some(request) = self.requests.find_mut(|r| r.id == request_id) else {
            debug!("decision {} for unknown request {} ignored", decision, request_id);
            return None;
        };
        request.status = decision.into();
        request.reason = reason;
        info!("request {} {}", request_id, decision);

        Some(Notification::for_decision(decision))
    }

    pub fn approve(&mut self, request_id: &str) -> Option<Notification> {
        self.decide(request_id, Decision::Approved, None)
    }

    pub fn deny(&mut self, request_id: &str) -> Option<Notification> {
        self.decide(request_id, Decision::Denied, None)
    }

    /// Replaces the current selection. Unknown ids are ignored.
    pub fn select_node(&mut self, node_id: &str) -> bool {
        if !self.topology.contains(node_id) {
            debug!("select of unknown node {} ignored", node_id);
            return false;
        }
        self.selected_node = Some(node_id.to_string());
        true
    }

    pub fn selected_node(&self) -> Option<&NetworkNode> {
        self.selected_node.as_deref().and_then(|id| self.topology.get(id))
    }

    pub fn requests(&self) -> impl Iterator<Item = &AccessRequest> {
        self.requests.iter()
    }

    pub fn events(&self) -> impl Iterator<Item = &SecurityEvent> {
        self.events.iter()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            ticks: self.ticks,
            requests: self.requests.to_vec(),
            events: self.events.to_vec(),
            nodes: self.topology.nodes().to_vec(),
            selected_node: self.selected_node.clone(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::ScriptedDraw;
    use chrono::Duration;
    use common::{NotificationStyle, RequestStatus};

    fn scripted(indices: &[usize], risks: &[u8], chances: &[bool]) -> Simulator<ScriptedDraw> {
        Simulator::new(ScriptedDraw::new(indices, risks, chances), &SimulatorConfig::default())
    }

    fn seeded(seed: u64) -> Simulator<RandomDraw<rand::rngs::StdRng>> {
        let config = SimulatorConfig { seed: Some(seed), ..SimulatorConfig::default() };
        Simulator::from_config(&config)
    }

    fn run_ticks<D: Draw>(sim: &mut Simulator<D>, n: usize) {
        let start = Utc::now();
        for i in 0..n {
            sim.tick(start + Duration::seconds(3 * i as i64));
        }
    }

    #[test]
    fn test_tick_prepends_scripted_request() {
        let mut sim = scripted(&[1, 1, 1], &[55], &[false]);
        sim.tick(Utc::now());

        let first = sim.requests().next().unwrap();
        assert_eq!(first.user, "Jane Smith");
        assert_eq!(first.resource, "File Server");
        assert_eq!(first.location, "London");
        assert_eq!(first.risk_score, 55);
        assert_eq!(first.status, RequestStatus::Pending);
        assert_eq!(sim.events().count(), 0);
    }

    #[test]
    fn test_collections_bounded_and_newest_first() {
        let mut sim = seeded(11);
        let start = Utc::now();
        for i in 0..40 {
            sim.tick(start + Duration::seconds(3 * i));
            let snap = sim.snapshot();
            assert!(snap.requests.len() <= 10);
            assert!(snap.events.len() <= 10);
            assert!(snap.requests.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
            assert!(snap.events.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
            assert!(snap.requests.iter().all(|r| r.risk_score <= 100 && r.is_pending()));
        }
        assert_eq!(sim.ticks(), 40);
    }

    #[test]
    fn test_eleventh_request_evicts_oldest() {
        let mut sim = seeded(3);
        run_ticks(&mut sim, 10);
        let before = sim.snapshot().requests;
        assert_eq!(before.len(), 10);
        let oldest = before.last().unwrap().id.clone();

        let outcome = sim.tick(Utc::now() + Duration::hours(1));
        let after = sim.snapshot().requests;
        assert_eq!(after.len(), 10);
        assert_eq!(after[0], outcome.request);
        assert!(after.iter().all(|r| r.id != oldest));
        assert_eq!(&after[1..], &before[..9]);
    }

    #[test]
    fn test_deny_at_index_three_of_five() {
        let mut sim = seeded(21);
        run_ticks(&mut sim, 5);
        let before = sim.snapshot().requests;
        let target = before[3].id.clone();

        let note = sim.deny(&target).unwrap();
        assert_eq!(note.style, NotificationStyle::Alert);

        let after = sim.snapshot().requests;
        assert_eq!(after.len(), 5);
        assert_eq!(after[3].status, RequestStatus::Denied);
        assert_eq!(after[3].reason.as_deref(), Some("Policy violation"));
        for i in [0, 1, 2, 4] {
            assert_eq!(after[i], before[i]);
        }
    }

    #[test]
    fn test_approve_changes_only_status() {
        let mut sim = seeded(8);
        run_ticks(&mut sim, 4);
        let before = sim.snapshot().requests;
        let target = before[1].id.clone();

        let note = sim.approve(&target).unwrap();
        assert_eq!(note.title, "Access approved");
        assert_eq!(note.style, NotificationStyle::Info);

        let after = sim.snapshot().requests;
        let mut expected = before[1].clone();
        expected.status = RequestStatus::Approved;
        assert_eq!(after[1], expected);
        assert!(after[1].reason.is_none());
        assert_eq!(after[0], before[0]);
        assert_eq!(&after[2..], &before[2..]);
    }

    #[test]
    fn test_explicit_reasons_are_kept() {
        let mut sim = seeded(2);
        run_ticks(&mut sim, 2);
        let id = sim.snapshot().requests[0].id.clone();

        sim.decide(&id, Decision::Denied, Some("Unknown origin".to_string()));
        assert_eq!(sim.snapshot().requests[0].reason.as_deref(), Some("Unknown origin"));

        sim.decide(&id, Decision::Approved, Some("Verified by MFA".to_string()));
        let request = &sim.snapshot().requests[0];
        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(request.reason.as_deref(), Some("Verified by MFA"));
    }

    #[test]
    fn test_redeciding_overwrites() {
        let mut sim = seeded(4);
        run_ticks(&mut sim, 1);
        let id = sim.snapshot().requests[0].id.clone();

        sim.deny(&id);
        sim.approve(&id);
        let request = &sim.snapshot().requests[0];
        assert_eq!(request.status, RequestStatus::Approved);
        assert!(request.reason.is_none());
    }

    #[test]
    fn test_unknown_request_is_noop() {
        let mut sim = seeded(5);
        run_ticks(&mut sim, 3);
        let before = sim.snapshot().requests;

        assert!(sim.decide("req-999999", Decision::Denied, None).is_none());
        assert_eq!(sim.snapshot().requests, before);
    }

    #[test]
    fn test_evicted_request_is_noop() {
        let mut sim = seeded(6);
        run_ticks(&mut sim, 1);
        let first = sim.snapshot().requests[0].id.clone();
        run_ticks(&mut sim, 10);

        assert!(sim.approve(&first).is_none());
        assert!(sim.requests().all(|r| r.is_pending()));
    }

    #[test]
    fn test_select_replaces_previous() {
        let mut sim = seeded(1);
        assert!(sim.selected_node().is_none());

        assert!(sim.select_node("user1"));
        assert!(sim.select_node("db1"));
        assert_eq!(sim.selected_node().unwrap().id, "db1");
        assert_eq!(sim.snapshot().selected_node.as_deref(), Some("db1"));

        assert!(!sim.select_node("nope"));
        assert_eq!(sim.selected_node().unwrap().id, "db1");
    }

    #[test]
    fn test_snapshot_selected_details() {
        let mut sim = seeded(1);
        sim.select_node("app1");
        let details = sim.snapshot().selected_details().unwrap();
        assert_eq!(details.name, "CRM Application");
        assert_eq!(details.connection_count, 1);
    }

    #[test]
    fn test_ticks_never_touch_topology() {
        let mut sim = seeded(99);
        let before = sim.topology().nodes().to_vec();
        run_ticks(&mut sim, 25);
        assert_eq!(sim.topology().nodes(), &before[..]);
    }
}
