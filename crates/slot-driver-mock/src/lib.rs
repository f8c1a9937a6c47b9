//! Mock Hardware Driver for slot-daq
//!
//! Provides a simulated filter wheel for testing without physical hardware.
//! Timed completions run on tokio tasks (tokio::time::sleep, not
//! std::thread::sleep).
//!
//! # Performance Characteristics
//!
//! - MockFilterWheel: 50ms per slot travelled + 20ms settling, short way round
//!
//! # Driver Factory Pattern
//!
//! ```rust,ignore
//! use slot_driver_mock::MockFilterWheelFactory;
//! use slot_core::SlotDriverFactory;
//!
//! let factory = MockFilterWheelFactory;
//! factory.validate(&config)?;
//! let components = factory.build(config).await?;
//! ```

mod mock_filter_wheel;
mod mode;

pub use mock_filter_wheel::{MockFilterWheel, MockFilterWheelConfig, MockFilterWheelFactory};
pub use mode::MockMode;
