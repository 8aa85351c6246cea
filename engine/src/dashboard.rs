use common::{AccessRequest, RequestStatus, SecurityEvent};
use serde::Serialize;
use std::fmt;

use crate::simulator::Snapshot;

pub const RECENT_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn of(score: u8) -> Self {
        if score > 70 {
            RiskBand::High
        } else if score > 40 {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
        };
        f.write_str(s)
    }
}

/// Figures for the dashboard tab, derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub pending: usize,
    pub approved: usize,
    pub denied: usize,
    pub average_risk: Option<f32>,
    pub risk_level: RiskBand,
}

impl Summary {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let count = |status: RequestStatus| snapshot.requests.iter().filter(|r| r.status == status).count();

        let average_risk = if snapshot.requests.is_empty() {
            None
        } else {
            let total: u32 = snapshot.requests.iter().map(|r| u32::from(r.risk_score)).sum();
            Some(total as f32 / snapshot.requests.len() as f32)
        };
        let risk_level = average_risk
            .map(|avg| RiskBand::of(avg.round() as u8))
            .unwrap_or(RiskBand::Low);

        Summary {
            pending: count(RequestStatus::Pending),
            approved: count(RequestStatus::Approved),
            denied: count(RequestStatus::Denied),
            average_risk,
            risk_level,
        }
    }

    pub fn blocked(&self) -> usize {
        self.denied
    }
}

pub fn recent_requests(snapshot: &Snapshot) -> &[AccessRequest] {
    &snapshot.requests[..snapshot.requests.len().min(RECENT_ROWS)]
}

pub fn recent_events(snapshot: &Snapshot) -> &[SecurityEvent] {
    &snapshot.events[..snapshot.events.len().min(RECENT_ROWS)]
}
