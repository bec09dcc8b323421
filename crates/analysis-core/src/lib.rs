pub mod budget;
pub mod config;
pub mod error;
pub mod synthetic;
pub mod traits;
pub mod types;

pub use budget::RateLimiter;
pub use config::*;
pub use error::*;
pub use traits::*;
pub use types::*;
