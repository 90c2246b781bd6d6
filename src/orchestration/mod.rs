pub mod orchestrator;
pub mod snapshot;

pub use orchestrator::Orchestrator;
pub use snapshot::PortfolioSnapshot;
