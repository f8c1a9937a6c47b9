//! Driver factory for slot hardware.
//!
//! Drivers implement [`SlotDriverFactory`] so the application can build them
//! from a `toml::Value` configuration block without knowing the concrete
//! driver type:
//!
//! ```rust,ignore
//! let factory = MockFilterWheelFactory;
//! factory.validate(&config)?;
//! let components = factory.build(config).await?;
//!
//! let controller = SlotController::initialize(
//!     "Filter Wheel",
//!     PositionRange::default(),
//!     "Main Control",
//!     components.hardware,
//!     registry,
//! )?;
//! if let Some(slot) = components.reported_position {
//!     controller.complete_move(slot);
//! }
//! controller.update_properties(components.connection.as_ref());
//! ```

use crate::capabilities::{ConnectionState, SlotHardware};
use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Capability objects returned by a driver factory.
pub struct SlotComponents {
    /// Position hooks.
    pub hardware: Arc<dyn SlotHardware>,
    /// Connection state provider.
    pub connection: Arc<dyn ConnectionState>,
    /// Position names as reported by the hardware, in slot order.
    ///
    /// Empty when the hardware has no notion of names.
    pub reported_labels: Vec<String>,
    /// Position the hardware reports at connection time, if it knows it.
    pub reported_position: Option<i32>,
}

impl std::fmt::Debug for SlotComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotComponents")
            .field("connected", &self.connection.is_connected())
            .field("reported_labels", &self.reported_labels)
            .field("reported_position", &self.reported_position)
            .finish_non_exhaustive()
    }
}

/// Builds slot hardware from configuration.
pub trait SlotDriverFactory: Send + Sync {
    /// Identifier used in configuration files (e.g. `"mock_filter_wheel"`).
    fn driver_type(&self) -> &'static str;

    /// Human-readable driver name.
    fn name(&self) -> &'static str;

    /// Check a configuration block without building anything.
    fn validate(&self, config: &toml::Value) -> Result<()>;

    /// Build and connect the driver.
    fn build(&self, config: toml::Value) -> BoxFuture<'static, Result<SlotComponents>>;
}
