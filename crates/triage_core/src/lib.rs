pub mod config;
pub mod logging;
pub mod session;

pub use config::{Config, ConfigError};
pub use session::{PendingFlow, Session, SessionStore};
