//! CLI command implementations

mod config;
mod info;
mod record;

pub use config::{config, ConfigArgs};
pub use info::{info, InfoArgs};
pub use record::{record, RecordArgs};
