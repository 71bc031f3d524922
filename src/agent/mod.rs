pub mod channel;
pub mod eco_agent;
pub mod monitor;
pub mod problem;

pub use channel::{ChannelSnapshot, EcoChannel, EcoChannelListener};
pub use eco_agent::EcoAgent;
pub use monitor::{EcoMonitorAgent, MonitorState, ProblemMonitor, SolutionCheck};
pub use problem::EcoProblem;
