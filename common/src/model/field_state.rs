use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Presence-aware field of a sparse record.
///
/// `Absent` means the field was not sent at all and asserts nothing, `Null`
/// means the partner explicitly sent `null`. Use together with
/// `#[serde(default, skip_serializing_if = "FieldState::is_absent")]` so both
/// states survive a serialization round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Default for FieldState<T> {
    fn default() -> Self {
        FieldState::Absent
    }
}

impl<T> FieldState<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldState::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldState::Null)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FieldState::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> FieldState<&T> {
        match self {
            FieldState::Absent => FieldState::Absent,
            FieldState::Null => FieldState::Null,
            FieldState::Value(v) => FieldState::Value(v),
        }
    }

    /// Overlays `self` on `base`: anything but `Absent` wins.
    pub fn or(self, base: FieldState<T>) -> FieldState<T> {
        match self {
            FieldState::Absent => base,
            asserted => asserted,
        }
    }
}

impl<T> From<Option<T>> for FieldState<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldState::Value(v),
            None => FieldState::Null,
        }
    }
}

impl<T: Serialize> Serialize for FieldState<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldState::Value(v) => v.serialize(serializer),
            FieldState::Null | FieldState::Absent => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldState<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only reached when the key is present, so `None` here is an explicit null.
        Option::<T>::deserialize(deserializer).map(FieldState::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Sparse {
        #[serde(default, skip_serializing_if = "FieldState::is_absent")]
        name: FieldState<String>,
        #[serde(default, skip_serializing_if = "FieldState::is_absent")]
        note: FieldState<String>,
    }

    #[test]
    fn distinguishes_absent_null_and_value() {
        let parsed: Sparse = serde_json::from_value(json!({ "note": null })).unwrap();
        assert!(parsed.name.is_absent());
        assert!(parsed.note.is_null());

        let parsed: Sparse = serde_json::from_value(json!({ "name": "steel" })).unwrap();
        assert_eq!(parsed.name.value().map(String::as_str), Some("steel"));
    }

    #[test]
    fn absent_is_omitted_and_null_is_kept_on_output() {
        let sparse = Sparse {
            name: FieldState::Absent,
            note: FieldState::Null,
        };
        assert_eq!(serde_json::to_value(&sparse).unwrap(), json!({ "note": null }));
    }

    #[test]
    fn overlay_keeps_base_only_when_absent() {
        assert_eq!(FieldState::Absent.or(FieldState::Value(1)), FieldState::Value(1));
        assert_eq!(FieldState::Null.or(FieldState::Value(1)), FieldState::Null);
        assert_eq!(FieldState::Value(2).or(FieldState::Value(1)), FieldState::Value(2));
    }
}
