//! Instrument assembly and client-side operations.
//!
//! [`SlotApp`] builds the configured driver through its factory, wires it to a
//! [`SlotController`] and an in-process [`MemoryRegistry`], and offers the
//! operations the CLI exposes. Requests go through the same transport entry
//! points a remote client would use, and results are read back from the
//! published property state.

use crate::config::AppConfig;
use anyhow::{anyhow, bail, Context, Result};
use slot_core::{
    LabelProperty, MemoryRegistry, NumberRequest, Outcome, PropertyEvent, PropertyState,
    SlotController, SlotDriverFactory, SlotSnapshot, TextRequest, LABEL_PROPERTY, POSITION_FIELD,
    POSITION_PROPERTY,
};
use slot_driver_mock::MockFilterWheelFactory;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::timeout;
use tracing::{debug, info};

/// Factories for every driver type this build knows about.
pub fn driver_factories() -> Vec<Box<dyn SlotDriverFactory>> {
    vec![Box::new(MockFilterWheelFactory)]
}

/// Look up the factory registered for `driver_type`.
pub fn find_factory(driver_type: &str) -> Result<Box<dyn SlotDriverFactory>> {
    let factories = driver_factories();
    let known: Vec<&'static str> = factories.iter().map(|f| f.driver_type()).collect();
    factories
        .into_iter()
        .find(|f| f.driver_type() == driver_type)
        .ok_or_else(|| {
            anyhow!(
                "Unknown driver type '{}'. Known types: {}",
                driver_type,
                known.join(", ")
            )
        })
}

/// A configured slot instrument.
pub struct SlotApp {
    controller: SlotController,
    registry: Arc<MemoryRegistry>,
}

impl SlotApp {
    /// Build the driver, initialize the controller and publish its properties.
    pub async fn build(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let factory = find_factory(&config.driver.r#type)?;
        factory
            .validate(&config.driver.config)
            .with_context(|| format!("invalid {} configuration", factory.driver_type()))?;
        let components = factory
            .build(config.driver.config.clone())
            .await
            .with_context(|| format!("failed to build {}", factory.name()))?;
        debug!(driver = factory.name(), ?components, "Driver ready");

        let range = config.device.range()?;
        let registry = Arc::new(MemoryRegistry::new());
        let controller = SlotController::initialize(
            config.device.name.clone(),
            range,
            config.device.group.clone(),
            components.hardware,
            registry.clone(),
        )?;

        if config.device.enable_labels {
            controller.enable_labels();
            let names = if config.device.labels.is_empty() {
                components.reported_labels
            } else {
                config.device.labels.clone()
            };
            controller.load_labels(names);
        }

        if let Some(slot) = components.reported_position {
            controller.complete_move(slot);
        }

        controller.update_properties(components.connection.as_ref());
        info!(
            device = %config.device.name,
            driver = factory.driver_type(),
            min = range.min,
            max = range.max,
            "Slot device ready"
        );

        Ok(Self {
            controller,
            registry,
        })
    }

    /// Underlying controller.
    pub fn controller(&self) -> &SlotController {
        &self.controller
    }

    /// Registry the properties are published to.
    pub fn registry(&self) -> &Arc<MemoryRegistry> {
        &self.registry
    }

    /// Current property state.
    pub fn snapshot(&self) -> SlotSnapshot {
        self.controller.snapshot()
    }

    /// Move to `slot` and wait up to `wait` for the move to settle.
    ///
    /// Returns the confirmed slot.
    pub async fn select(&self, slot: i32, wait: Duration) -> Result<i32> {
        let mut events = self.registry.subscribe();
        let request = NumberRequest::new(
            self.controller.device(),
            POSITION_PROPERTY,
            POSITION_FIELD,
            f64::from(slot),
        );

        let outcome = self.controller.process_number(&request);
        if let Some(err) = outcome.error() {
            bail!(err.clone());
        }
        if outcome != Outcome::Accepted {
            bail!("unexpected outcome for slot request: {outcome:?}");
        }

        if self.controller.position_state() == PropertyState::Busy {
            timeout(wait, wait_until_settled(&mut events))
                .await
                .with_context(|| format!("slot {slot} not reached within {wait:?}"))??;
        }

        match self.controller.position_state() {
            PropertyState::Ok => Ok(self.controller.position()),
            state => bail!("move to slot {slot} ended in {state}"),
        }
    }

    /// Rename slots, given as `(slot, name)` pairs with 1-based slots.
    ///
    /// Returns the full label list after the update.
    pub async fn rename(&self, entries: &[(usize, String)]) -> Result<Vec<String>> {
        let values = entries
            .iter()
            .map(|(slot, name)| {
                let index = slot
                    .checked_sub(1)
                    .ok_or_else(|| anyhow!("slot numbers start at 1"))?;
                Ok((LabelProperty::field_name(index), name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let request = TextRequest::new(self.controller.device(), LABEL_PROPERTY, values);

        let outcome = self.controller.process_text(&request);
        if let Some(err) = outcome.error() {
            bail!(err.clone());
        }
        if outcome != Outcome::Applied {
            bail!("unexpected outcome for rename request: {outcome:?}");
        }
        self.controller
            .labels()
            .ok_or_else(|| anyhow!("labels disappeared after update"))
    }

    /// Delete the published properties.
    pub fn shutdown(&self) {
        self.controller.publish(false);
        debug!(device = %self.controller.device(), "Properties deleted");
    }
}

async fn wait_until_settled(events: &mut broadcast::Receiver<PropertyEvent>) -> Result<()> {
    loop {
        match events.recv().await {
            Ok(PropertyEvent::Updated(vector))
                if vector.name() == POSITION_PROPERTY && vector.state.is_settled() =>
            {
                return Ok(());
            }
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => bail!("property registry closed"),
        }
    }
}
