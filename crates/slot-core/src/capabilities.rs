//! Hardware-facing capability traits.
//!
//! A driver that moves between discrete positions implements
//! [`SlotHardware`]; the controller only ever sees `Arc<dyn SlotHardware>`.
//! Connection state is a separate, read-only capability so that the same
//! driver object (or a dedicated connection manager) can provide it.
//!
//! # Contract
//!
//! - Hooks are non-blocking initiators. `begin_move` starts motion and
//!   returns; the physical result arrives later through the
//!   [`MoveCompletion`] carried by the request.
//! - `begin_move` returns `false` only for immediate, synchronous refusal.
//! - Hooks run while the controller holds its per-instrument lock. Completing
//!   synchronously from inside `begin_move` on the same thread is allowed.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Turret { link: SerialLink }
//!
//! impl SlotHardware for Turret {
//!     fn begin_move(&self, request: MoveRequest) -> bool {
//!         let MoveRequest { target, completion } = request;
//!         if self.link.send(format!("GOTO {target}")).is_err() {
//!             return false;
//!         }
//!         self.link.on_arrival(move |slot| completion.complete(slot));
//!         true
//!     }
//!
//!     fn persist_labels(&self, labels: &[String]) -> bool {
//!         self.link.write_names(labels).is_ok()
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

pub use crate::controller::MoveCompletion;

/// A move the controller asks the hardware to start.
#[derive(Debug)]
pub struct MoveRequest {
    /// Validated target position.
    pub target: i32,
    /// One-shot handle to report the outcome.
    pub completion: MoveCompletion,
}

/// Capability: discrete position selection with optional per-position names.
pub trait SlotHardware: Send + Sync {
    /// Start moving toward `request.target`.
    ///
    /// Return `false` only when the hardware refuses immediately. On `true`
    /// the driver owns `request.completion` and must eventually call
    /// [`MoveCompletion::complete`] or [`MoveCompletion::fail`]; until then
    /// the position property stays `Busy`.
    fn begin_move(&self, request: MoveRequest) -> bool;

    /// Accept `labels` as the authoritative position names.
    fn persist_labels(&self, labels: &[String]) -> bool;
}

/// Capability: reports whether the instrument is connected.
pub trait ConnectionState: Send + Sync {
    /// Current connection status.
    fn is_connected(&self) -> bool;
}

impl ConnectionState for AtomicBool {
    fn is_connected(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}
