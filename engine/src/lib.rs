//! Mock ZTNA activity feed: timed access requests and security events,
//! operator decisions, and a fixed network map to inspect.

pub mod controller;
pub mod dashboard;
pub mod feed;
pub mod recent;
pub mod simulator;
pub mod topology;

pub use controller::{Command, SimulatorHandle};
pub use dashboard::{RiskBand, Summary};
pub use feed::{Draw, FeedGenerator, RandomDraw};
pub use simulator::{Simulator, Snapshot, TickOutcome, DEFAULT_DENY_REASON};
pub use topology::{NodeDetails, Topology};
