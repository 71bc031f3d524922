pub mod context;
pub mod memory;
pub mod traits;

pub use context::AgentContext;
pub use memory::{InMemoryKernel, IterationReport, RunOutcome, RunSummary};
pub use traits::{EcoTransport, Kernel, KernelAgent, KernelEvent};
