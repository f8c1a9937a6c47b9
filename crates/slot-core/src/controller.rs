//! Slot capability controller.
//!
//! [`SlotController`] owns the position property (and the optional label
//! property), validates client writes, drives the lifecycle and delegates the
//! physical move to a [`SlotHardware`] implementation.
//!
//! # Request Flow
//!
//! ```text
//! client write ──▶ validate ──fail──▶ Alert + notify
//!                     │
//!                     ▼
//!               Busy + notify ──▶ begin_move ──false──▶ Alert + notify
//!                                     │
//!                                   true
//!                                     ▼
//!                     (later) MoveCompletion::complete ──▶ Ok + notify
//! ```
//!
//! Every lifecycle state reached produces exactly one registry notification.
//! Failures never surface as transport errors: clients read them from the
//! property state. [`Outcome`] carries the reason back to the local caller.
//!
//! # Locking
//!
//! All state sits behind one re-entrant lock per instrument. Client requests
//! and hardware completions both take it, so a completion can never interleave
//! with a request half-way through its transition. The lock is re-entrant so
//! a driver may report completion synchronously from inside `begin_move`. No
//! `RefCell` borrow is ever held across a hook or registry call.
//!
//! Each accepted move gets a ticket. A completion whose ticket is no longer
//! the pending one belongs to a superseded move and is dropped, so a late
//! completion cannot turn a newer `Busy` into a stale `Ok`.

use crate::capabilities::{ConnectionState, MoveRequest, SlotHardware};
use crate::error::{CapabilityError, ConfigError};
use crate::lifecycle::PropertyState;
use crate::property::{
    LabelProperty, PositionProperty, PositionRange, LABEL_PROPERTY, POSITION_FIELD,
    POSITION_PROPERTY,
};
use crate::registry::PropertyRegistry;
use crate::request::{NumberRequest, TextRequest};
use parking_lot::ReentrantMutex;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

// =============================================================================
// Outcome
// =============================================================================

/// Result of processing a client request.
///
/// Only `NotHandled` means the request was not for this controller; every
/// other variant means it was processed and the property state tells clients
/// what happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Addressed to another device or property. Nothing changed.
    NotHandled,
    /// Move started; the position stays `Busy` until completion.
    Accepted,
    /// Labels applied and persisted.
    Applied,
    /// Processed and failed. The property is in `Alert` unless the error is
    /// [`CapabilityError::Unsupported`].
    Failed(CapabilityError),
}

impl Outcome {
    /// Whether the controller consumed the request.
    pub fn is_handled(&self) -> bool {
        !matches!(self, Outcome::NotHandled)
    }

    /// Failure reason, if any.
    pub fn error(&self) -> Option<&CapabilityError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

// =============================================================================
// Internal State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingMove {
    ticket: u64,
    target: i32,
}

#[derive(Debug)]
struct SlotState {
    position: PositionProperty,
    labels: Option<LabelProperty>,
    pending: Option<PendingMove>,
    next_ticket: u64,
}

impl SlotState {
    fn validate_target(&self, field: &str, requested: f64) -> Result<i32, CapabilityError> {
        if field != POSITION_FIELD {
            return Err(CapabilityError::UnknownField {
                property: POSITION_PROPERTY.to_string(),
                field: field.to_string(),
            });
        }

        let range = self.position.range();
        let out_of_range = || CapabilityError::OutOfRange {
            requested,
            min: range.min,
            max: range.max,
        };

        if !requested.is_finite() {
            return Err(out_of_range());
        }

        // Slots are integral; wire values truncate toward zero.
        let slot = requested.trunc();
        if slot < f64::from(range.min) || slot > f64::from(range.max) {
            return Err(out_of_range());
        }

        Ok(slot as i32)
    }

    fn pending_ticket(&self) -> Option<u64> {
        self.pending.map(|pending| pending.ticket)
    }

    fn start_move(&mut self, target: i32) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending = Some(PendingMove { ticket, target });
        self.position.set_state(PropertyState::Busy);
        ticket
    }
}

struct Shared {
    device: String,
    group: String,
    hardware: Arc<dyn SlotHardware>,
    registry: Arc<dyn PropertyRegistry>,
    state: ReentrantMutex<RefCell<SlotState>>,
}

impl Shared {
    fn notify_position(&self, cell: &RefCell<SlotState>) {
        let vector = cell.borrow().position.to_vector();
        self.registry.notify(&vector);
    }

    fn notify_labels(&self, cell: &RefCell<SlotState>) {
        let vector = cell.borrow().labels.as_ref().map(LabelProperty::to_vector);
        if let Some(vector) = vector {
            self.registry.notify(&vector);
        }
    }

    /// Confirm the physical position. A `None` ticket always applies.
    fn complete(&self, ticket: Option<u64>, final_value: i32) -> bool {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            if let Some(ticket) = ticket {
                if state.pending_ticket() != Some(ticket) {
                    debug!(
                        device = %self.device,
                        ticket,
                        final_value,
                        "Ignoring completion of a superseded move"
                    );
                    return false;
                }
            }

            state.pending = None;
            let range = state.position.range();
            if range.contains(final_value) {
                state.position.set_value(final_value);
                state.position.set_state(PropertyState::Ok);
                info!(device = %self.device, slot = final_value, "Slot change complete");
            } else {
                state.position.set_state(PropertyState::Alert);
                error!(
                    device = %self.device,
                    final_value,
                    min = range.min,
                    max = range.max,
                    "Hardware reported a position outside the valid range"
                );
            }
        }
        self.notify_position(&guard);
        true
    }

    fn fail(&self, ticket: u64, reason: &str) -> bool {
        let guard = self.state.lock();
        {
            let mut state = guard.borrow_mut();
            if state.pending_ticket() != Some(ticket) {
                debug!(device = %self.device, ticket, "Ignoring failure of a superseded move");
                return false;
            }
            state.pending = None;
            state.position.set_state(PropertyState::Alert);
        }
        error!(device = %self.device, ticket, reason, "Slot change failed");
        self.notify_position(&guard);
        true
    }
}

// =============================================================================
// MoveCompletion
// =============================================================================

/// One-shot handle a driver uses to report the end of an accepted move.
///
/// Consumed on use, so a move is completed at most once through it. Holds
/// only a weak reference: reporting after the controller is gone is a no-op.
#[must_use = "the position stays Busy until the move is completed or failed"]
pub struct MoveCompletion {
    shared: Weak<Shared>,
    ticket: u64,
    target: i32,
}

impl MoveCompletion {
    /// Ticket of the move this handle belongs to.
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Target the move was started for.
    pub fn target(&self) -> i32 {
        self.target
    }

    /// Report the position the hardware settled at.
    ///
    /// Returns `false` if the move was superseded by a newer request or the
    /// controller no longer exists.
    pub fn complete(self, final_value: i32) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.complete(Some(self.ticket), final_value),
            None => false,
        }
    }

    /// Report that the move failed after it was accepted.
    pub fn fail(self, reason: &str) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.fail(self.ticket, reason),
            None => false,
        }
    }
}

impl fmt::Debug for MoveCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoveCompletion")
            .field("ticket", &self.ticket)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time copy of the controller's properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotSnapshot {
    /// Position property.
    pub position: PositionProperty,
    /// Label property, if enabled.
    pub labels: Option<LabelProperty>,
    /// Target of the move in progress, if any.
    pub pending_target: Option<i32>,
}

// =============================================================================
// SlotController
// =============================================================================

/// Discrete position capability of one instrument.
///
/// Cloning shares the same controller.
#[derive(Clone)]
pub struct SlotController {
    shared: Arc<Shared>,
}

impl fmt::Debug for SlotController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotController")
            .field("device", &self.shared.device)
            .field("group", &self.shared.group)
            .finish_non_exhaustive()
    }
}

impl SlotController {
    /// Build the position property in `Idle`. Labels stay disabled.
    pub fn initialize(
        device: impl Into<String>,
        range: PositionRange,
        group: impl Into<String>,
        hardware: Arc<dyn SlotHardware>,
        registry: Arc<dyn PropertyRegistry>,
    ) -> Result<Self, ConfigError> {
        let device = device.into();
        if device.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceName);
        }
        range.validate()?;

        let group = group.into();
        let position = PositionProperty::new(&device, &group, range);
        debug!(
            device = %device,
            min = range.min,
            max = range.max,
            step = range.step,
            "Position property initialized"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                device,
                group,
                hardware,
                registry,
                state: ReentrantMutex::new(RefCell::new(SlotState {
                    position,
                    labels: None,
                    pending: None,
                    next_ticket: 0,
                })),
            }),
        })
    }

    /// Owning device name.
    pub fn device(&self) -> &str {
        &self.shared.device
    }

    // -------------------------------------------------------------------------
    // Labels setup
    // -------------------------------------------------------------------------

    /// Allocate the label property with one empty entry per position.
    ///
    /// Idempotent.
    pub fn enable_labels(&self) {
        let guard = self.shared.state.lock();
        let mut state = guard.borrow_mut();
        if state.labels.is_some() {
            return;
        }

        let count = state.position.range().label_count();
        state.labels = Some(LabelProperty::new(
            &self.shared.device,
            &self.shared.group,
            count,
        ));
        debug!(device = %self.shared.device, count, "Position labels enabled");
    }

    /// Whether [`enable_labels`](Self::enable_labels) has been called.
    pub fn labels_enabled(&self) -> bool {
        self.shared.state.lock().borrow().labels.is_some()
    }

    /// Fill the labels with names reported by the hardware.
    ///
    /// Extra names are dropped and missing ones left empty.
    ///
    /// # Panics
    ///
    /// If labels were never enabled. That is an integration bug in the
    /// owning instrument, not a runtime condition.
    pub fn load_labels<I>(&self, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        let guard = self.shared.state.lock();
        {
            let mut state = guard.borrow_mut();
            assert!(
                state.labels.is_some(),
                "load_labels called on device '{}' before enable_labels",
                self.shared.device
            );
            if let Some(labels) = state.labels.as_mut() {
                labels.fill(names);
            }
        }
        self.shared.notify_labels(&guard);
    }

    // -------------------------------------------------------------------------
    // Publication
    // -------------------------------------------------------------------------

    /// Define (`connected`) or delete (`!connected`) the properties.
    pub fn publish(&self, connected: bool) {
        let guard = self.shared.state.lock();
        let (position, labels) = {
            let state = guard.borrow();
            (
                state.position.to_vector(),
                state.labels.as_ref().map(LabelProperty::to_vector),
            )
        };

        let registry = &self.shared.registry;
        if connected {
            registry.define(&position);
            if let Some(labels) = labels {
                registry.define(&labels);
            }
        } else {
            registry.undefine(&self.shared.device, POSITION_PROPERTY);
            if labels.is_some() {
                registry.undefine(&self.shared.device, LABEL_PROPERTY);
            }
        }
    }

    /// Read the connection state once and publish accordingly.
    pub fn update_properties(&self, connection: &dyn ConnectionState) {
        self.publish(connection.is_connected());
    }

    // -------------------------------------------------------------------------
    // Position requests
    // -------------------------------------------------------------------------

    /// Transport entry point for number writes.
    ///
    /// Uses the first `(field, value)` pair. A request with no pairs names no
    /// field and is rejected as [`CapabilityError::UnknownField`].
    pub fn process_number(&self, request: &NumberRequest) -> Outcome {
        if request.device != self.shared.device || request.property != POSITION_PROPERTY {
            return Outcome::NotHandled;
        }

        match request.values.first() {
            Some((field, value)) => self.request_position(field, *value),
            None => {
                let guard = self.shared.state.lock();
                self.reject_position(
                    &guard,
                    CapabilityError::UnknownField {
                        property: POSITION_PROPERTY.to_string(),
                        field: String::new(),
                    },
                )
            }
        }
    }

    /// Validate and start a move to `requested` on `field`.
    pub fn request_position(&self, field: &str, requested: f64) -> Outcome {
        let shared = &self.shared;
        let guard = shared.state.lock();

        let validated = guard.borrow().validate_target(field, requested);
        let target = match validated {
            Ok(target) => target,
            Err(err) => return self.reject_position(&guard, err),
        };

        let superseded = guard.borrow().pending;
        if let Some(previous) = superseded {
            warn!(
                device = %shared.device,
                previous = previous.target,
                slot = target,
                "New slot request supersedes a move in progress"
            );
        }

        let ticket = guard.borrow_mut().start_move(target);
        info!(device = %shared.device, slot = target, ticket, "Setting current slot");
        shared.notify_position(&guard);

        let completion = MoveCompletion {
            shared: Arc::downgrade(shared),
            ticket,
            target,
        };
        if shared.hardware.begin_move(MoveRequest { target, completion }) {
            debug!(device = %shared.device, ticket, "Move accepted, awaiting completion");
            return Outcome::Accepted;
        }

        // A refused request leaves an earlier move in flight; its completion
        // must still land.
        {
            let mut state = guard.borrow_mut();
            if state.pending_ticket() == Some(ticket) {
                state.pending = superseded;
            }
        }
        self.reject_position(&guard, CapabilityError::HardwareRejected { target })
    }

    /// Typed shortcut for [`request_position`](Self::request_position).
    pub fn select(&self, slot: i32) -> Outcome {
        self.request_position(POSITION_FIELD, f64::from(slot))
    }

    /// Hardware-side confirmation that the wheel is at `final_value`.
    ///
    /// Unlike [`MoveCompletion::complete`] this is not tied to a ticket and
    /// always applies. A value outside the range leaves the old value and
    /// raises `Alert`.
    pub fn complete_move(&self, final_value: i32) {
        self.shared.complete(None, final_value);
    }

    fn reject_position(&self, cell: &RefCell<SlotState>, err: CapabilityError) -> Outcome {
        error!(device = %self.shared.device, error = %err, "Slot request rejected");
        cell.borrow_mut().position.set_state(PropertyState::Alert);
        self.shared.notify_position(cell);
        Outcome::Failed(err)
    }

    // -------------------------------------------------------------------------
    // Label requests
    // -------------------------------------------------------------------------

    /// Transport entry point for text writes.
    pub fn process_text(&self, request: &TextRequest) -> Outcome {
        if request.device != self.shared.device || request.property != LABEL_PROPERTY {
            return Outcome::NotHandled;
        }

        let guard = self.shared.state.lock();
        let resolved: Result<Vec<(usize, String)>, CapabilityError> = {
            let state = guard.borrow();
            let Some(labels) = state.labels.as_ref() else {
                debug!(device = %self.shared.device, "Label write for a device without labels");
                return Outcome::Failed(CapabilityError::Unsupported);
            };
            request
                .values
                .iter()
                .map(|(field, text)| {
                    labels
                        .index_of(field)
                        .map(|index| (index, text.clone()))
                        .ok_or_else(|| CapabilityError::UnknownField {
                            property: LABEL_PROPERTY.to_string(),
                            field: field.clone(),
                        })
                })
                .collect()
        };

        match resolved {
            Ok(updates) => self.rename_labels(&updates),
            Err(err) => self.reject_labels(&guard, err),
        }
    }

    /// Merge `(index, text)` updates into the labels and persist them.
    ///
    /// Labels are applied before `persist_labels` runs and are kept when it
    /// fails.
    pub fn rename_labels(&self, updates: &[(usize, String)]) -> Outcome {
        let shared = &self.shared;
        let guard = shared.state.lock();

        let applied = {
            let mut state = guard.borrow_mut();
            let Some(labels) = state.labels.as_mut() else {
                debug!(device = %shared.device, "Position labels not enabled");
                return Outcome::Failed(CapabilityError::Unsupported);
            };

            match updates.iter().find(|(index, _)| *index >= labels.len()) {
                Some((index, _)) => Err(CapabilityError::UnknownField {
                    property: LABEL_PROPERTY.to_string(),
                    field: LabelProperty::field_name(*index),
                }),
                None => {
                    for (index, text) in updates {
                        labels.set(*index, text);
                    }
                    labels.set_state(PropertyState::Ok);
                    Ok(labels.labels().to_vec())
                }
            }
        };

        let labels = match applied {
            Ok(labels) => labels,
            Err(err) => return self.reject_labels(&guard, err),
        };

        if shared.hardware.persist_labels(&labels) {
            info!(device = %shared.device, updated = updates.len(), "Position labels updated");
            shared.notify_labels(&guard);
            return Outcome::Applied;
        }

        self.reject_labels(&guard, CapabilityError::PersistFailed)
    }

    fn reject_labels(&self, cell: &RefCell<SlotState>, err: CapabilityError) -> Outcome {
        error!(device = %self.shared.device, error = %err, "Label request rejected");
        if let Some(labels) = cell.borrow_mut().labels.as_mut() {
            labels.set_state(PropertyState::Alert);
        }
        self.shared.notify_labels(cell);
        Outcome::Failed(err)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Copy of both properties and the pending target.
    pub fn snapshot(&self) -> SlotSnapshot {
        let guard = self.shared.state.lock();
        let state = guard.borrow();
        SlotSnapshot {
            position: state.position.clone(),
            labels: state.labels.clone(),
            pending_target: state.pending.map(|pending| pending.target),
        }
    }

    /// Confirmed position.
    pub fn position(&self) -> i32 {
        self.shared.state.lock().borrow().position.value()
    }

    /// Position lifecycle state.
    pub fn position_state(&self) -> PropertyState {
        self.shared.state.lock().borrow().position.state()
    }

    /// Target of the move in progress.
    pub fn pending_target(&self) -> Option<i32> {
        self.shared
            .state
            .lock()
            .borrow()
            .pending
            .map(|pending| pending.target)
    }

    /// Current labels, `None` when unsupported.
    pub fn labels(&self) -> Option<Vec<String>> {
        self.shared
            .state
            .lock()
            .borrow()
            .labels
            .as_ref()
            .map(|labels| labels.labels().to_vec())
    }

    /// Label lifecycle state, `None` when unsupported.
    pub fn label_state(&self) -> Option<PropertyState> {
        self.shared
            .state
            .lock()
            .borrow()
            .labels
            .as_ref()
            .map(LabelProperty::state)
    }
}
