//! # slot-daq
//!
//! Application layer for discrete position instruments. The property model,
//! lifecycle and controller live in `slot-core`; drivers live in their own
//! crates (`slot-driver-mock`). This crate wires them together.
//!
//! ## Crate Structure
//!
//! - **`app`**: `SlotApp` builds the configured driver through its factory,
//!   initializes the controller and exposes select/rename/show operations.
//! - **`config`**: Figment-based configuration (TOML file + `SLOT_DAQ_`
//!   environment overrides) with validation.
//! - **`tracing_init`**: `tracing-subscriber` setup driven by the
//!   configuration.

pub mod app;
pub mod config;
pub mod tracing_init;

pub use app::SlotApp;
pub use config::AppConfig;
