//! Position and label properties.
//!
//! Both properties are plain data owned by the
//! [`SlotController`](crate::controller::SlotController); only the controller
//! mutates them. What leaves the controller is a [`PropertyVector`], the
//! serializable snapshot handed to the property registry on every define and
//! update.
//!
//! # Wire Shape
//!
//! | Property | Kind | Fields |
//! |----------|------|--------|
//! | `FILTER_SLOT` | number | `FILTER_SLOT_VALUE` (min, max, step, value) |
//! | `FILTER_NAME` | text | `FILTER_SLOT_NAME_1` .. `FILTER_SLOT_NAME_<max>` |

use crate::error::ConfigError;
use crate::lifecycle::PropertyState;
use serde::{Deserialize, Serialize};

/// Name of the position property.
pub const POSITION_PROPERTY: &str = "FILTER_SLOT";
/// Single field of the position property.
pub const POSITION_FIELD: &str = "FILTER_SLOT_VALUE";
/// Name of the optional label property.
pub const LABEL_PROPERTY: &str = "FILTER_NAME";

/// Advisory timeout advertised to clients. Nothing enforces it.
pub const DEFAULT_TIMEOUT_SECS: u32 = 60;

/// Largest supported `max` of a position range.
pub const MAX_POSITIONS: i32 = 1024;

const POSITION_LABEL: &str = "Filter Slot";
const POSITION_FIELD_LABEL: &str = "Filter";
const POSITION_FORMAT: &str = "%3.0f";
const LABEL_PROPERTY_LABEL: &str = "Filter";

// =============================================================================
// Position Range
// =============================================================================

/// Static inclusive bounds of the position property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRange {
    /// Lowest selectable position.
    pub min: i32,
    /// Highest selectable position.
    pub max: i32,
    /// Increment between positions.
    pub step: i32,
}

impl Default for PositionRange {
    fn default() -> Self {
        Self {
            min: 1,
            max: 12,
            step: 1,
        }
    }
}

impl PositionRange {
    /// Build a validated range.
    pub fn new(min: i32, max: i32, step: i32) -> Result<Self, ConfigError> {
        let range = Self { min, max, step };
        range.validate()?;
        Ok(range)
    }

    /// Check `min <= max <= MAX_POSITIONS` and `step > 0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        if self.max > MAX_POSITIONS {
            return Err(ConfigError::TooManyPositions {
                max: self.max,
                limit: MAX_POSITIONS,
            });
        }
        if self.step <= 0 {
            return Err(ConfigError::InvalidStep(self.step));
        }
        Ok(())
    }

    /// Inclusive membership test.
    pub fn contains(&self, position: i32) -> bool {
        (self.min..=self.max).contains(&position)
    }

    /// Number of label slots: one per position `1..=max`.
    pub fn label_count(&self) -> usize {
        usize::try_from(self.max).unwrap_or(0)
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Routing identity of a property, scoped to its device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyIdentity {
    /// Owning device name.
    pub device: String,
    /// Property name, unique within the device.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// UI group the property belongs to.
    pub group: String,
}

impl PropertyIdentity {
    fn new(device: &str, name: &str, label: &str, group: &str) -> Self {
        Self {
            device: device.to_string(),
            name: name.to_string(),
            label: label.to_string(),
            group: group.to_string(),
        }
    }
}

/// Client access to a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Clients may only read.
    ReadOnly,
    /// Clients may only write.
    WriteOnly,
    /// Clients may read and write.
    #[default]
    ReadWrite,
}

// =============================================================================
// Property Vectors (wire snapshots)
// =============================================================================

/// One numeric field of a number vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberField {
    /// Field name.
    pub name: String,
    /// Field label.
    pub label: String,
    /// printf-style display format.
    pub format: String,
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Increment.
    pub step: f64,
    /// Current value.
    pub value: f64,
}

/// One text field of a text vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    /// Field name.
    pub name: String,
    /// Field label.
    pub label: String,
    /// Current text.
    pub text: String,
}

/// Field payload of a property vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum PropertyValues {
    /// Numeric fields.
    Number(Vec<NumberField>),
    /// Text fields.
    Text(Vec<TextField>),
}

/// Snapshot of a property as published to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyVector {
    /// Routing identity.
    #[serde(flatten)]
    pub identity: PropertyIdentity,
    /// Lifecycle state at snapshot time.
    pub state: PropertyState,
    /// Client access.
    pub permission: Permission,
    /// Advisory timeout in seconds.
    pub timeout_secs: u32,
    /// Field values.
    pub values: PropertyValues,
}

impl PropertyVector {
    /// Owning device name.
    pub fn device(&self) -> &str {
        &self.identity.device
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Value of a numeric field, if this is a number vector holding it.
    pub fn number(&self, field: &str) -> Option<f64> {
        match &self.values {
            PropertyValues::Number(fields) => {
                fields.iter().find(|f| f.name == field).map(|f| f.value)
            }
            PropertyValues::Text(_) => None,
        }
    }

    /// Text of a text field, if this is a text vector holding it.
    pub fn text(&self, field: &str) -> Option<&str> {
        match &self.values {
            PropertyValues::Text(fields) => fields
                .iter()
                .find(|f| f.name == field)
                .map(|f| f.text.as_str()),
            PropertyValues::Number(_) => None,
        }
    }
}

// =============================================================================
// PositionProperty
// =============================================================================

/// The currently selected position of the instrument.
///
/// `value` is the *confirmed* position. A requested target is tracked by the
/// controller until hardware completion, so a rejected or pending request
/// never changes what clients read here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionProperty {
    identity: PropertyIdentity,
    range: PositionRange,
    value: i32,
    state: PropertyState,
    permission: Permission,
    timeout_secs: u32,
}

impl PositionProperty {
    /// Create the property in `Idle`, positioned at `range.min`.
    pub fn new(device: &str, group: &str, range: PositionRange) -> Self {
        Self {
            identity: PropertyIdentity::new(device, POSITION_PROPERTY, POSITION_LABEL, group),
            range,
            value: range.min,
            state: PropertyState::Idle,
            permission: Permission::ReadWrite,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Routing identity.
    pub fn identity(&self) -> &PropertyIdentity {
        &self.identity
    }

    /// Declared bounds.
    pub fn range(&self) -> PositionRange {
        self.range
    }

    /// Confirmed position.
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Lifecycle state.
    pub fn state(&self) -> PropertyState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: PropertyState) {
        self.state = state;
    }

    pub(crate) fn set_value(&mut self, value: i32) {
        self.value = value;
    }

    /// Wire snapshot.
    pub fn to_vector(&self) -> PropertyVector {
        PropertyVector {
            identity: self.identity.clone(),
            state: self.state,
            permission: self.permission,
            timeout_secs: self.timeout_secs,
            values: PropertyValues::Number(vec![NumberField {
                name: POSITION_FIELD.to_string(),
                label: POSITION_FIELD_LABEL.to_string(),
                format: POSITION_FORMAT.to_string(),
                min: f64::from(self.range.min),
                max: f64::from(self.range.max),
                step: f64::from(self.range.step),
                value: f64::from(self.value),
            }]),
        }
    }
}

// =============================================================================
// LabelProperty
// =============================================================================

/// Per-position names, one entry per slot `1..=max`.
///
/// Entries start empty; the owning instrument fills them from the hardware
/// through [`SlotController::load_labels`](crate::controller::SlotController::load_labels).
/// The controller never changes the number of entries after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelProperty {
    identity: PropertyIdentity,
    labels: Vec<String>,
    state: PropertyState,
    permission: Permission,
    timeout_secs: u32,
}

impl LabelProperty {
    /// Create `count` empty labels in `Idle`.
    pub fn new(device: &str, group: &str, count: usize) -> Self {
        Self {
            identity: PropertyIdentity::new(device, LABEL_PROPERTY, LABEL_PROPERTY_LABEL, group),
            labels: vec![String::new(); count],
            state: PropertyState::Idle,
            permission: Permission::ReadWrite,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Field name for the 0-based `index`.
    pub fn field_name(index: usize) -> String {
        format!("FILTER_SLOT_NAME_{}", index + 1)
    }

    /// Resolve a field name back to its 0-based index.
    pub fn index_of(&self, field: &str) -> Option<usize> {
        let index = field
            .strip_prefix("FILTER_SLOT_NAME_")?
            .parse::<usize>()
            .ok()?
            .checked_sub(1)?;
        (index < self.labels.len()).then_some(index)
    }

    /// Routing identity.
    pub fn identity(&self) -> &PropertyIdentity {
        &self.identity
    }

    /// All labels in slot order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label at a 0-based index.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when the device has no positions to name.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Lifecycle state.
    pub fn state(&self) -> PropertyState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: PropertyState) {
        self.state = state;
    }

    /// Overwrite one entry. Out-of-bounds indices are ignored; callers check
    /// bounds first.
    pub(crate) fn set(&mut self, index: usize, text: &str) {
        if let Some(slot) = self.labels.get_mut(index) {
            slot.clear();
            slot.push_str(text);
        }
    }

    /// Replace all entries, keeping the entry count fixed.
    pub(crate) fn fill(&mut self, names: impl IntoIterator<Item = String>) {
        let count = self.labels.len();
        let mut names: Vec<String> = names.into_iter().take(count).collect();
        names.resize(count, String::new());
        self.labels = names;
    }

    /// Wire snapshot.
    pub fn to_vector(&self) -> PropertyVector {
        let fields = self
            .labels
            .iter()
            .enumerate()
            .map(|(index, text)| TextField {
                name: Self::field_name(index),
                label: format!("Filter#{}", index + 1),
                text: text.clone(),
            })
            .collect();

        PropertyVector {
            identity: self.identity.clone(),
            state: self.state,
            permission: self.permission,
            timeout_secs: self.timeout_secs,
            values: PropertyValues::Text(fields),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_range() {
        let range = PositionRange::default();
        assert_eq!((range.min, range.max, range.step), (1, 12, 1));
        assert!(range.validate().is_ok());
        assert_eq!(range.label_count(), 12);
    }

    #[test]
    fn test_range_validation() {
        assert_eq!(
            PositionRange::new(5, 1, 1),
            Err(ConfigError::InvalidRange { min: 5, max: 1 })
        );
        assert_eq!(PositionRange::new(1, 5, 0), Err(ConfigError::InvalidStep(0)));
        assert!(PositionRange::new(3, 3, 1).is_ok());
    }

    #[test]
    fn test_range_max_is_bounded() {
        assert!(PositionRange::new(1, MAX_POSITIONS, 1).is_ok());
        assert_eq!(
            PositionRange::new(1, 200_000_000, 1),
            Err(ConfigError::TooManyPositions {
                max: 200_000_000,
                limit: MAX_POSITIONS,
            })
        );
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = PositionRange::new(1, 5, 1).unwrap();
        assert!(range.contains(1));
        assert!(range.contains(5));
        assert!(!range.contains(0));
        assert!(!range.contains(6));
    }

    #[test]
    fn test_position_vector_shape() {
        let prop = PositionProperty::new("Wheel", "Main Control", PositionRange::default());
        let vector = prop.to_vector();

        assert_eq!(vector.device(), "Wheel");
        assert_eq!(vector.name(), POSITION_PROPERTY);
        assert_eq!(vector.identity.group, "Main Control");
        assert_eq!(vector.state, PropertyState::Idle);
        assert_eq!(vector.timeout_secs, 60);
        assert_eq!(vector.number(POSITION_FIELD), Some(1.0));
        assert_eq!(vector.text(POSITION_FIELD), None);

        match &vector.values {
            PropertyValues::Number(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].min, 1.0);
                assert_eq!(fields[0].max, 12.0);
                assert_eq!(fields[0].format, "%3.0f");
            }
            PropertyValues::Text(_) => panic!("position must be a number vector"),
        }
    }

    #[test]
    fn test_label_field_names_round_trip() {
        let prop = LabelProperty::new("Wheel", "Main Control", 5);
        assert_eq!(LabelProperty::field_name(0), "FILTER_SLOT_NAME_1");
        assert_eq!(prop.index_of("FILTER_SLOT_NAME_1"), Some(0));
        assert_eq!(prop.index_of("FILTER_SLOT_NAME_5"), Some(4));
        assert_eq!(prop.index_of("FILTER_SLOT_NAME_6"), None);
        assert_eq!(prop.index_of("FILTER_SLOT_NAME_0"), None);
        assert_eq!(prop.index_of("FILTER_SLOT_VALUE"), None);
    }

    #[test]
    fn test_label_fill_keeps_count() {
        let mut prop = LabelProperty::new("Wheel", "Main Control", 3);
        prop.fill(vec!["Red".to_string()]);
        assert_eq!(prop.labels(), ["Red", "", ""]);

        prop.fill((1..=5).map(|i| format!("F{i}")));
        assert_eq!(prop.labels(), ["F1", "F2", "F3"]);
    }

    #[test]
    fn test_label_vector_serializes() {
        let mut prop = LabelProperty::new("Wheel", "Main Control", 2);
        prop.set(1, "Green");
        let vector = prop.to_vector();
        assert_eq!(vector.text("FILTER_SLOT_NAME_2"), Some("Green"));

        let json = serde_json::to_value(&vector).unwrap();
        assert_eq!(json["name"], "FILTER_NAME");
        assert_eq!(json["values"]["kind"], "text");
        assert_eq!(json["values"]["fields"][1]["label"], "Filter#2");
    }
}
