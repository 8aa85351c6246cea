use chrono::{DateTime, Utc};
use common::{AccessRequest, EventKind, RequestStatus, SecurityEvent, Severity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const USERS: [&str; 5] = ["John Doe", "Jane Smith", "Bob Wilson", "Alice Brown", "Charlie Davis"];

pub const RESOURCES: [&str; 5] = [
    "Customer Database",
    "File Server",
    "CRM Application",
    "HR Portal",
    "Finance Dashboard",
];

/// The last entry marks a request whose origin could not be resolved.
pub const LOCATIONS: [&str; 5] = ["New York", "London", "Tokyo", "San Francisco", "Unknown"];

pub const EVENT_TEMPLATES: [(EventKind, &str, Severity); 3] = [
    (EventKind::Threat, "Suspicious login attempt detected", Severity::High),
    (EventKind::Access, "Access granted to sensitive resource", Severity::Medium),
    (EventKind::Policy, "Policy violation detected", Severity::Critical),
];

pub const MAX_RISK_SCORE: u8 = 100;

/// Source of the random choices made on every tick.
pub trait Draw {
    /// Uniform index in `0..len`.
    fn index(&mut self, len: usize) -> usize;
    /// Uniform score in `0..=MAX_RISK_SCORE`.
    fn risk_score(&mut self) -> u8;
    /// `true` with probability `p`.
    fn chance(&mut self, p: f64) -> bool;
}

pub struct RandomDraw<R> {
    rng: R,
}

impl<R: Rng> RandomDraw<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomDraw<StdRng> {
    pub fn seeded(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rng)
    }
}

impl<R: Rng> Draw for RandomDraw<R> {
    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn risk_score(&mut self) -> u8 {
        self.rng.gen_range(0..=MAX_RISK_SCORE)
    }

    fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Monotonic identifiers such as `req-000042`.
#[derive(Debug, Clone)]
pub struct IdSequence {
    prefix: &'static str,
    next: u64,
}

impl IdSequence {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix, next: 1 }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("{}-{:06}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

pub struct FeedGenerator<D> {
    draw: D,
    event_probability: f64,
    request_ids: IdSequence,
    event_ids: IdSequence,
}

impl<D: Draw> FeedGenerator<D> {
    pub fn new(draw: D, event_probability: f64) -> Self {
        Self {
            draw,
            event_probability,
            request_ids: IdSequence::new("req"),
            event_ids: IdSequence::new("evt"),
        }
    }

    pub fn next_request(&mut self, now: DateTime<Utc>) -> AccessRequest {
        let user = USERS[self.draw.index(USERS.len())];
        let resource = RESOURCES[self.draw.index(RESOURCES.len())];
        let location = LOCATIONS[self.draw.index(LOCATIONS.len())];
        let risk_score = self.draw.risk_score();
        debug_assert!(risk_score <= MAX_RISK_SCORE, "risk score {} above {}", risk_score, MAX_RISK_SCORE);

        AccessRequest {
            id: self.request_ids.next_id(),
            user: user.to_string(),
            resource: resource.to_string(),
            location: location.to_string(),
            risk_score,
            status: RequestStatus::Pending,
            timestamp: now,
            reason: None,
        }
    }

    pub fn maybe_event(&mut self, now: DateTime<Utc>) -> Option<SecurityEvent> {
        if !self.draw.chance(self.event_probability) {
            return None;
        }
        let (kind, message, severity) = EVENT_TEMPLATES[self.draw.index(EVENT_TEMPLATES.len())];
        Some(SecurityEvent {
            id: self.event_ids.next_id(),
            kind,
            message: message.to_string(),
            severity,
            timestamp: now,
        })
    }
}


/// Replays fixed answers, then falls back to zero / no-event.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct ScriptedDraw {
    pub indices: std::collections::VecDeque<usize>,
    pub risks: std::collections::VecDeque<u8>,
    pub chances: std::collections::VecDeque<bool>,
}

#[cfg(test)]
impl ScriptedDraw {
    pub fn new(indices: &[usize], risks: &[u8], chances: &[bool]) -> Self {
        Self {
            indices: indices.iter().copied().collect(),
            risks: risks.iter().copied().collect(),
            chances: chances.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
impl Draw for ScriptedDraw {
    fn index(&mut self, len: usize) -> usize {
        self.indices.pop_front().unwrap_or(0) % len
    }

    fn risk_score(&mut self) -> u8 {
        self.risks.pop_front().unwrap_or(0)
    }

    fn chance(&mut self, _p: f64) -> bool {
        self.chances.pop_front().unwrap_or(false)
    }
}
