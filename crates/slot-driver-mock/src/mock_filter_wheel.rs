//! Mock filter wheel implementation.

use crate::mode::MockMode;
use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use slot_core::{
    ConnectionState, MoveRequest, SlotComponents, SlotDriverFactory, SlotHardware, MAX_POSITIONS,
};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::sleep;

// =============================================================================
// MockFilterWheelFactory - SlotDriverFactory implementation
// =============================================================================

/// Configuration for MockFilterWheel driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockFilterWheelConfig {
    /// Number of physical slots (default: 12)
    #[serde(default = "default_slot_count")]
    pub slot_count: i32,

    /// Slot the wheel sits at on power-up (default: 1)
    #[serde(default = "default_initial_slot")]
    pub initial_slot: i32,

    /// Completion mode (default: instant)
    #[serde(default)]
    pub mode: MockMode,

    /// Travel time per slot in realistic mode (default: 50ms)
    #[serde(default = "default_ms_per_slot")]
    pub ms_per_slot: u64,

    /// Settling time after travel in realistic mode (default: 20ms)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Refuse every move
    #[serde(default)]
    pub reject_moves: bool,

    /// Fail every label write
    #[serde(default)]
    pub fail_persist: bool,

    /// Names stored in the wheel's EEPROM. Defaults to "Filter 1", "Filter 2", ...
    #[serde(default)]
    pub filter_names: Vec<String>,
}

fn default_slot_count() -> i32 {
    12
}

fn default_initial_slot() -> i32 {
    1
}

fn default_ms_per_slot() -> u64 {
    50
}

fn default_settle_ms() -> u64 {
    20
}

impl Default for MockFilterWheelConfig {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
            initial_slot: default_initial_slot(),
            mode: MockMode::default(),
            ms_per_slot: default_ms_per_slot(),
            settle_ms: default_settle_ms(),
            reject_moves: false,
            fail_persist: false,
            filter_names: Vec::new(),
        }
    }
}

/// Factory for creating MockFilterWheel instances.
pub struct MockFilterWheelFactory;

impl SlotDriverFactory for MockFilterWheelFactory {
    fn driver_type(&self) -> &'static str {
        "mock_filter_wheel"
    }

    fn name(&self) -> &'static str {
        "Mock Filter Wheel"
    }

    fn validate(&self, config: &toml::Value) -> Result<()> {
        let cfg: MockFilterWheelConfig = config.clone().try_into()?;

        if !(1..=MAX_POSITIONS).contains(&cfg.slot_count) {
            return Err(anyhow!(
                "Slot count {} outside range (1-{})",
                cfg.slot_count,
                MAX_POSITIONS
            ));
        }

        if !(1..=cfg.slot_count).contains(&cfg.initial_slot) {
            return Err(anyhow!(
                "Initial slot {} outside range (1-{})",
                cfg.initial_slot,
                cfg.slot_count
            ));
        }

        if cfg.filter_names.len() > cfg.slot_count as usize {
            return Err(anyhow!(
                "{} filter names for {} slots",
                cfg.filter_names.len(),
                cfg.slot_count
            ));
        }

        Ok(())
    }

    fn build(&self, config: toml::Value) -> BoxFuture<'static, Result<SlotComponents>> {
        Box::pin(async move {
            let cfg: MockFilterWheelConfig = config
                .try_into()
                .context("invalid mock_filter_wheel configuration")?;

            let wheel = Arc::new(MockFilterWheel::with_config(cfg));
            wheel.connect();

            Ok(SlotComponents {
                reported_labels: wheel.stored_labels(),
                reported_position: Some(wheel.current_slot()),
                hardware: wheel.clone(),
                connection: wheel,
            })
        })
    }
}

// =============================================================================
// MockFilterWheel - Simulated Filter Wheel
// =============================================================================

/// Mock filter wheel with realistic behavior.
///
/// Simulates a motorized wheel with:
/// - Slots numbered `1..=slot_count`, travelling the short way round
/// - Instant or timed completion (see [`MockMode`])
/// - Connection state
/// - Name storage standing in for the wheel's EEPROM
/// - Rejection and persistence fault injection
///
/// # Example
///
/// ```rust,ignore
/// let wheel = Arc::new(MockFilterWheel::new());
/// wheel.connect();
/// let controller = SlotController::initialize("Wheel", range, "Main", wheel.clone(), registry)?;
/// controller.select(5); // Ok immediately in instant mode
/// assert_eq!(wheel.current_slot(), 5);
/// ```
pub struct MockFilterWheel {
    slot_count: i32,
    mode: MockMode,
    ms_per_slot: u64,
    settle_ms: u64,

    /// Physical slot, updated when motion ends
    current_slot: Arc<AtomicI32>,

    /// Incremented per move; a travel task only lands if it is still current
    generation: Arc<AtomicU64>,

    moving: Arc<AtomicBool>,
    connected: AtomicBool,
    reject_moves: AtomicBool,
    fail_persist: AtomicBool,
    move_count: AtomicUsize,

    stored_labels: RwLock<Vec<String>>,
}

impl MockFilterWheel {
    /// Create a new MockFilterWheel with default configuration.
    pub fn new() -> Self {
        Self::with_config(MockFilterWheelConfig::default())
    }

    /// Create a new MockFilterWheel with custom configuration.
    ///
    /// The wheel starts disconnected.
    pub fn with_config(config: MockFilterWheelConfig) -> Self {
        let slot_count = config.slot_count.clamp(1, MAX_POSITIONS);
        let mut names = config.filter_names;
        let count = slot_count as usize;
        if names.len() < count {
            names.extend((names.len() + 1..=count).map(|slot| format!("Filter {slot}")));
        }
        names.truncate(count);

        Self {
            slot_count,
            mode: config.mode,
            ms_per_slot: config.ms_per_slot,
            settle_ms: config.settle_ms,
            current_slot: Arc::new(AtomicI32::new(config.initial_slot.clamp(1, slot_count))),
            generation: Arc::new(AtomicU64::new(0)),
            moving: Arc::new(AtomicBool::new(false)),
            connected: AtomicBool::new(false),
            reject_moves: AtomicBool::new(config.reject_moves),
            fail_persist: AtomicBool::new(config.fail_persist),
            move_count: AtomicUsize::new(0),
            stored_labels: RwLock::new(names),
        }
    }

    /// Simulate the connection handshake.
    pub fn connect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(slots = self.slot_count, "MockFilterWheel: Connected");
    }

    /// Drop the simulated link.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        tracing::info!("MockFilterWheel: Disconnected");
    }

    /// Number of slots.
    pub fn slot_count(&self) -> i32 {
        self.slot_count
    }

    /// Slot the wheel physically sits at.
    pub fn current_slot(&self) -> i32 {
        self.current_slot.load(Ordering::SeqCst)
    }

    /// Whether a timed move is in progress.
    pub fn is_moving(&self) -> bool {
        self.moving.load(Ordering::SeqCst)
    }

    /// Number of moves accepted so far.
    pub fn move_count(&self) -> usize {
        self.move_count.load(Ordering::SeqCst)
    }

    /// Names currently held in the simulated EEPROM.
    pub fn stored_labels(&self) -> Vec<String> {
        self.stored_labels.read().clone()
    }

    /// Toggle rejection of every move.
    pub fn set_reject_moves(&self, reject: bool) {
        self.reject_moves.store(reject, Ordering::SeqCst);
    }

    /// Toggle failure of every label write.
    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    /// Slots travelled between two positions, taking the short way round.
    fn distance(&self, from: i32, to: i32) -> i32 {
        let direct = (to - from).abs();
        direct.min(self.slot_count - direct)
    }

    /// Calculate movement duration based on slots travelled.
    pub fn travel_time(&self, from: i32, to: i32) -> Duration {
        let slots = self.distance(from, to).unsigned_abs();
        Duration::from_millis(u64::from(slots) * self.ms_per_slot + self.settle_ms)
    }
}

impl Default for MockFilterWheel {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState for MockFilterWheel {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl SlotHardware for MockFilterWheel {
    fn begin_move(&self, request: MoveRequest) -> bool {
        let MoveRequest { target, completion } = request;

        if !self.is_connected() {
            tracing::warn!(target, "MockFilterWheel: Move requested while disconnected");
            return false;
        }

        if self.reject_moves.load(Ordering::SeqCst) {
            tracing::warn!(target, "MockFilterWheel: Rejecting move (fault injection)");
            return false;
        }

        if !(1..=self.slot_count).contains(&target) {
            tracing::warn!(
                target,
                slots = self.slot_count,
                "MockFilterWheel: No such slot"
            );
            return false;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.move_count.fetch_add(1, Ordering::SeqCst);
        let from = self.current_slot();

        match self.mode {
            MockMode::Instant => {
                self.current_slot.store(target, Ordering::SeqCst);
                tracing::debug!(from, target, "MockFilterWheel: Moved");
                if !completion.complete(target) {
                    tracing::debug!(target, "MockFilterWheel: Completion no longer wanted");
                }
            }
            MockMode::Realistic => {
                let Ok(runtime) = Handle::try_current() else {
                    tracing::error!("MockFilterWheel: Realistic mode requires a tokio runtime");
                    return false;
                };

                let duration = self.travel_time(from, target);
                let current_slot = Arc::clone(&self.current_slot);
                let latest = Arc::clone(&self.generation);
                let moving = Arc::clone(&self.moving);
                moving.store(true, Ordering::SeqCst);
                tracing::debug!(from, target, ?duration, "MockFilterWheel: Moving");

                runtime.spawn(async move {
                    sleep(duration).await;

                    if latest.load(Ordering::SeqCst) != generation {
                        tracing::debug!(target, "MockFilterWheel: Move abandoned for a newer one");
                        return;
                    }
                    current_slot.store(target, Ordering::SeqCst);
                    moving.store(false, Ordering::SeqCst);

                    if !completion.complete(target) {
                        tracing::debug!(target, "MockFilterWheel: Completion no longer wanted");
                    }
                });
            }
        }

        true
    }

    fn persist_labels(&self, labels: &[String]) -> bool {
        if self.fail_persist.load(Ordering::SeqCst) {
            tracing::warn!("MockFilterWheel: EEPROM write failed (fault injection)");
            return false;
        }

        *self.stored_labels.write() = labels.to_vec();
        tracing::debug!(count = labels.len(), "MockFilterWheel: Names stored");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slot_core::{MemoryRegistry, Outcome, PositionRange, PropertyState, SlotController};

    fn controller_for(wheel: Arc<MockFilterWheel>, max: i32) -> SlotController {
        SlotController::initialize(
            "Mock Wheel",
            PositionRange::new(1, max, 1).unwrap(),
            "Filter Wheel",
            wheel,
            Arc::new(MemoryRegistry::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_factory_driver_type() {
        let factory = MockFilterWheelFactory;
        assert_eq!(factory.driver_type(), "mock_filter_wheel");
        assert_eq!(factory.name(), "Mock Filter Wheel");
    }

    #[tokio::test]
    async fn test_factory_validate_config() {
        let factory = MockFilterWheelFactory;

        let valid = toml::toml! {
            slot_count = 5
            initial_slot = 3
            mode = "realistic"
        };
        assert!(factory.validate(&toml::Value::Table(valid)).is_ok());

        let bad_initial = toml::toml! {
            slot_count = 5
            initial_slot = 6
        };
        assert!(factory
            .validate(&toml::Value::Table(bad_initial))
            .is_err());

        let no_slots = toml::toml! {
            slot_count = 0
        };
        assert!(factory.validate(&toml::Value::Table(no_slots)).is_err());

        let huge = toml::toml! {
            slot_count = 200000000
        };
        assert!(factory.validate(&toml::Value::Table(huge)).is_err());

        let too_many_names = toml::toml! {
            slot_count = 2
            filter_names = ["L", "R", "G"]
        };
        assert!(factory
            .validate(&toml::Value::Table(too_many_names))
            .is_err());
    }

    #[tokio::test]
    async fn test_factory_build_connects() -> Result<()> {
        let factory = MockFilterWheelFactory;
        let config = toml::toml! {
            slot_count = 3
            initial_slot = 2
            filter_names = ["Red"]
        };

        let components = factory.build(toml::Value::Table(config)).await?;
        assert!(components.connection.is_connected());
        assert_eq!(components.reported_position, Some(2));
        assert_eq!(components.reported_labels, vec!["Red", "Filter 2", "Filter 3"]);
        Ok(())
    }

    #[test]
    fn test_travel_takes_short_way_round() {
        let wheel = MockFilterWheel::with_config(MockFilterWheelConfig {
            slot_count: 8,
            ms_per_slot: 10,
            settle_ms: 5,
            ..Default::default()
        });
        assert_eq!(wheel.travel_time(1, 2), Duration::from_millis(15));
        assert_eq!(wheel.travel_time(1, 8), Duration::from_millis(15));
        assert_eq!(wheel.travel_time(1, 5), Duration::from_millis(45));
        assert_eq!(wheel.travel_time(3, 3), Duration::from_millis(5));
    }

    #[test]
    fn test_instant_move_completes_synchronously() {
        let wheel = Arc::new(MockFilterWheel::new());
        wheel.connect();
        let controller = controller_for(wheel.clone(), 12);

        assert_eq!(controller.select(7), Outcome::Accepted);
        assert_eq!(controller.position_state(), PropertyState::Ok);
        assert_eq!(controller.position(), 7);
        assert_eq!(wheel.current_slot(), 7);
        assert_eq!(wheel.move_count(), 1);
    }

    #[test]
    fn test_disconnected_wheel_rejects() {
        let wheel = Arc::new(MockFilterWheel::new());
        let controller = controller_for(wheel.clone(), 12);

        assert!(matches!(controller.select(2), Outcome::Failed(_)));
        assert_eq!(controller.position_state(), PropertyState::Alert);
        assert_eq!(wheel.move_count(), 0);
    }

    #[test]
    fn test_reject_injection() {
        let wheel = Arc::new(MockFilterWheel::new());
        wheel.connect();
        wheel.set_reject_moves(true);
        let controller = controller_for(wheel.clone(), 12);

        assert!(matches!(controller.select(4), Outcome::Failed(_)));
        assert_eq!(wheel.current_slot(), 1);

        wheel.set_reject_moves(false);
        assert_eq!(controller.select(4), Outcome::Accepted);
        assert_eq!(wheel.current_slot(), 4);
    }

    #[test]
    fn test_range_wider_than_wheel_is_rejected_by_hardware() {
        let wheel = Arc::new(MockFilterWheel::with_config(MockFilterWheelConfig {
            slot_count: 5,
            ..Default::default()
        }));
        wheel.connect();
        let controller = controller_for(wheel.clone(), 8);

        assert!(matches!(controller.select(7), Outcome::Failed(_)));
        assert_eq!(wheel.move_count(), 0);
    }

    #[test]
    fn test_persist_labels() {
        let wheel = MockFilterWheel::with_config(MockFilterWheelConfig {
            slot_count: 2,
            ..Default::default()
        });
        assert_eq!(wheel.stored_labels(), vec!["Filter 1", "Filter 2"]);

        assert!(wheel.persist_labels(&["Red".to_string(), "Green".to_string()]));
        assert_eq!(wheel.stored_labels(), vec!["Red", "Green"]);

        wheel.set_fail_persist(true);
        assert!(!wheel.persist_labels(&["Blue".to_string(), "Green".to_string()]));
        assert_eq!(wheel.stored_labels(), vec!["Red", "Green"]);
    }

    #[tokio::test]
    async fn test_realistic_move_completes_later() {
        let wheel = Arc::new(MockFilterWheel::with_config(MockFilterWheelConfig {
            mode: MockMode::Realistic,
            ms_per_slot: 5,
            settle_ms: 5,
            ..Default::default()
        }));
        wheel.connect();
        let controller = controller_for(wheel.clone(), 12);

        assert_eq!(controller.select(3), Outcome::Accepted);
        assert_eq!(controller.position_state(), PropertyState::Busy);
        assert!(wheel.is_moving());

        sleep(Duration::from_millis(200)).await;

        assert_eq!(controller.position_state(), PropertyState::Ok);
        assert_eq!(controller.position(), 3);
        assert!(!wheel.is_moving());
    }

    #[tokio::test]
    async fn test_rejected_request_does_not_lose_travel_in_progress() {
        let wheel = Arc::new(MockFilterWheel::with_config(MockFilterWheelConfig {
            mode: MockMode::Realistic,
            ms_per_slot: 5,
            settle_ms: 5,
            ..Default::default()
        }));
        wheel.connect();
        let controller = controller_for(wheel.clone(), 12);

        assert_eq!(controller.select(5), Outcome::Accepted);
        wheel.set_reject_moves(true);
        assert!(matches!(controller.select(2), Outcome::Failed(_)));
        assert_eq!(controller.position_state(), PropertyState::Alert);

        sleep(Duration::from_millis(200)).await;

        assert_eq!(wheel.current_slot(), 5);
        assert_eq!(controller.position(), 5);
        assert_eq!(controller.position_state(), PropertyState::Ok);
    }

    #[test]
    fn test_realistic_without_runtime_rejects() {
        let wheel = Arc::new(MockFilterWheel::with_config(MockFilterWheelConfig {
            mode: MockMode::Realistic,
            ..Default::default()
        }));
        wheel.connect();
        let controller = controller_for(wheel, 12);

        assert!(matches!(controller.select(3), Outcome::Failed(_)));
    }
}
