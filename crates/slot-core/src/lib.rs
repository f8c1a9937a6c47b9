//! `slot-core`
//!
//! Discrete position capability for controllable instruments: filter wheels,
//! turrets, selectors. An instrument exposes "which of N positions is
//! selected" (plus optional per-position names) to remote clients through a
//! synchronized property protocol.
//!
//! ## Key Types
//!
//! - [`SlotController`]: validates writes, drives the Idle/Busy/Ok/Alert
//!   lifecycle and delegates the physical move to the hardware
//! - [`SlotHardware`]: hooks a driver implements (`begin_move`,
//!   `persist_labels`)
//! - [`MoveCompletion`]: one-shot handle the driver uses to report the end of
//!   an accepted move
//! - [`PropertyRegistry`]: publication boundary (`define`, `undefine`,
//!   `notify`), with [`MemoryRegistry`] as the in-process implementation
//! - [`CapabilityError`]: why a request ended in `Alert`
//!
//! ## Example
//!
//! ```rust,ignore
//! use slot_core::{MemoryRegistry, PositionRange, SlotController};
//!
//! let registry = Arc::new(MemoryRegistry::new());
//! let controller = SlotController::initialize(
//!     "Filter Wheel",
//!     PositionRange::default(),
//!     "Main Control",
//!     hardware,
//!     registry.clone(),
//! )?;
//! controller.enable_labels();
//! controller.publish(true);
//!
//! // Busy now, Ok once the driver completes the move.
//! controller.select(3);
//! ```

pub mod capabilities;
pub mod controller;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod property;
pub mod registry;
pub mod request;

pub use capabilities::{ConnectionState, MoveRequest, SlotHardware};
pub use controller::{MoveCompletion, Outcome, SlotController, SlotSnapshot};
pub use driver::{SlotComponents, SlotDriverFactory};
pub use error::{CapabilityError, ConfigError};
pub use lifecycle::PropertyState;
pub use property::{
    LabelProperty, Permission, PositionProperty, PositionRange, PropertyIdentity,
    PropertyValues, PropertyVector, DEFAULT_TIMEOUT_SECS, LABEL_PROPERTY, MAX_POSITIONS,
    POSITION_FIELD, POSITION_PROPERTY,
};
pub use registry::{MemoryRegistry, PropertyEvent, PropertyRegistry};
pub use request::{NumberRequest, TextRequest};
