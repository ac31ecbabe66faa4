//! Capture session: configuration, rolling aggregation, alarms, and the
//! capture worker driven by the `Monitor` control surface.

pub mod aggregate;
pub mod alarm;
pub mod config;
pub mod session;
pub mod window;
pub mod worker;

pub use aggregate::{AggregateSnapshot, Ratio};
pub use alarm::BeepAlarm;
pub use config::{AppConfig, load_config, save_config};
pub use session::Monitor;
pub use worker::Phase;
