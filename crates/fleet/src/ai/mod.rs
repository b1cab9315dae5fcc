//! Tank decision making.

pub mod agent;
pub mod dispatcher;
pub mod registry;
pub mod state;

pub use agent::Agent;
pub use dispatcher::Dispatcher;
pub use registry::{AgentRegistry, Directive, Inbox};
pub use state::{AgentState, BodyState, Objective, Telemetry, TurretState};
