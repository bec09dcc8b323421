pub mod accuracy;
pub mod engine;
pub mod metrics;
pub mod models;
pub mod runner;
pub mod store;

pub use accuracy::quick_accuracy;
pub use engine::{BacktestEngine, BacktestJob, FusionPath, SignalGenerator, StepSignal, TechnicalPath};
pub use models::*;
pub use runner::BacktestRunner;
pub use store::{InMemoryTradeRepository, TradeRepository};
