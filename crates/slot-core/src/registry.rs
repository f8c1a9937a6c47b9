//! Property registry boundary.
//!
//! The controller never talks to clients directly. It hands property
//! snapshots to a [`PropertyRegistry`], which owns publication: `define` when
//! the device connects, `notify` on every lifecycle transition, `undefine` on
//! disconnect.
//!
//! [`MemoryRegistry`] is the in-process implementation used by the binary and
//! the tests. It keeps the last definition of every property and broadcasts a
//! [`PropertyEvent`] per call, so observers can await transitions without
//! polling:
//!
//! ```rust,ignore
//! let registry = Arc::new(MemoryRegistry::new());
//! let mut events = registry.subscribe();
//! controller.select(3);
//! while let Ok(event) = events.recv().await {
//!     if let PropertyEvent::Updated(vector) = event {
//!         println!("{} -> {}", vector.name(), vector.state);
//!     }
//! }
//! ```

use crate::property::PropertyVector;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Publication sink for property snapshots.
pub trait PropertyRegistry: Send + Sync {
    /// Make a property visible to clients.
    fn define(&self, property: &PropertyVector);

    /// Remove a property from clients.
    fn undefine(&self, device: &str, name: &str);

    /// Push a new snapshot of a property to clients.
    fn notify(&self, property: &PropertyVector);
}

/// One registry call, as seen by subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyEvent {
    /// `define` was called.
    Defined(PropertyVector),
    /// `notify` was called.
    Updated(PropertyVector),
    /// `undefine` was called.
    Deleted {
        /// Owning device.
        device: String,
        /// Property name.
        name: String,
    },
}

impl PropertyEvent {
    /// Property name the event refers to.
    pub fn name(&self) -> &str {
        match self {
            PropertyEvent::Defined(vector) | PropertyEvent::Updated(vector) => vector.name(),
            PropertyEvent::Deleted { name, .. } => name,
        }
    }
}

/// In-memory registry with broadcast notifications.
#[derive(Debug)]
pub struct MemoryRegistry {
    defined: RwLock<HashMap<(String, String), PropertyVector>>,
    events: broadcast::Sender<PropertyEvent>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            defined: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to future registry events.
    pub fn subscribe(&self) -> broadcast::Receiver<PropertyEvent> {
        self.events.subscribe()
    }

    /// Current snapshot of a defined property.
    pub fn get(&self, device: &str, name: &str) -> Option<PropertyVector> {
        self.defined
            .read()
            .get(&(device.to_string(), name.to_string()))
            .cloned()
    }

    /// Whether a property is currently defined.
    pub fn is_defined(&self, device: &str, name: &str) -> bool {
        self.defined
            .read()
            .contains_key(&(device.to_string(), name.to_string()))
    }

    /// Sorted names of all properties defined for a device.
    pub fn defined_names(&self, device: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .defined
            .read()
            .keys()
            .filter(|(dev, _)| dev == device)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn emit(&self, event: PropertyEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

impl PropertyRegistry for MemoryRegistry {
    fn define(&self, property: &PropertyVector) {
        let key = (property.device().to_string(), property.name().to_string());
        self.defined.write().insert(key, property.clone());
        tracing::debug!(device = property.device(), property = property.name(), "Property defined");
        self.emit(PropertyEvent::Defined(property.clone()));
    }

    fn undefine(&self, device: &str, name: &str) {
        let removed = self
            .defined
            .write()
            .remove(&(device.to_string(), name.to_string()));
        if removed.is_none() {
            tracing::debug!(device, property = name, "Deleting property that was never defined");
        }
        self.emit(PropertyEvent::Deleted {
            device: device.to_string(),
            name: name.to_string(),
        });
    }

    fn notify(&self, property: &PropertyVector) {
        let key = (property.device().to_string(), property.name().to_string());
        if let Some(current) = self.defined.write().get_mut(&key) {
            *current = property.clone();
        }
        self.emit(PropertyEvent::Updated(property.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::PropertyState;
    use crate::property::{PositionProperty, PositionRange, POSITION_PROPERTY};

    fn position_vector(state: PropertyState) -> PropertyVector {
        let mut prop = PositionProperty::new("Wheel", "Main", PositionRange::default());
        prop.set_state(state);
        prop.to_vector()
    }

    #[test]
    fn test_define_then_undefine() {
        let registry = MemoryRegistry::new();
        let mut events = registry.subscribe();

        registry.define(&position_vector(PropertyState::Idle));
        assert!(registry.is_defined("Wheel", POSITION_PROPERTY));
        assert_eq!(registry.defined_names("Wheel"), vec![POSITION_PROPERTY]);

        registry.undefine("Wheel", POSITION_PROPERTY);
        assert!(!registry.is_defined("Wheel", POSITION_PROPERTY));

        assert!(matches!(events.try_recv(), Ok(PropertyEvent::Defined(_))));
        assert!(matches!(
            events.try_recv(),
            Ok(PropertyEvent::Deleted { ref name, .. }) if name == POSITION_PROPERTY
        ));
    }

    #[test]
    fn test_notify_updates_defined_snapshot() {
        let registry = MemoryRegistry::new();
        registry.define(&position_vector(PropertyState::Idle));
        registry.notify(&position_vector(PropertyState::Busy));

        let current = registry.get("Wheel", POSITION_PROPERTY).unwrap();
        assert_eq!(current.state, PropertyState::Busy);
    }

    #[test]
    fn test_notify_undefined_is_broadcast_but_not_stored() {
        let registry = MemoryRegistry::new();
        let mut events = registry.subscribe();

        registry.notify(&position_vector(PropertyState::Alert));

        assert!(registry.get("Wheel", POSITION_PROPERTY).is_none());
        match events.try_recv() {
            Ok(PropertyEvent::Updated(vector)) => assert_eq!(vector.state, PropertyState::Alert),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
