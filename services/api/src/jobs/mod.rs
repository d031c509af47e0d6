pub mod poller;
pub mod runner;
pub mod worker;

pub use poller::{JobPoller, PollState};
pub use runner::LocalJobRunner;
pub use worker::WorkerContext;
