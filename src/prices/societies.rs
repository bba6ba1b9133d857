use std::collections::BTreeMap;

use crate::layer::Value;

/// Society names a listing location is matched against.
pub const DHA_SOCIETIES: [&str; 9] = [
    "DHA Phase 1", "DHA Phase 2", "DHA Phase 3", "DHA Phase 4", "DHA Phase 5",
    "DHA Phase 6", "DHA Phase 7", "DHA Phase 8", "DHA Phase 9",
];

/// Area polygon id → society name.
///
/// Several ids may share a name; their polygons are then drawn with the same
/// society average.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocietyLookup {
    names: BTreeMap<String, String>,
}

impl SocietyLookup {
    pub fn new<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self { names: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// The split-area ids of the DHA boundary file.
    pub fn dha() -> Self {
        Self::new([
            ("1", "DHA Phase 3"),
            ("2", "DHA Phase 2"),
            ("3", "DHA Phase 4"),
            ("4", "DHA Phase 5"),
            ("5", "DHA Phase 9"),
            ("6", "Askari 11"),
            ("7", "DHA Phase 7"),
            ("8", "DHA Phase 8"),
            ("9", "DHA Phase 8"),
            ("10", "DHA Phase 8"),
            ("11", "DHA Phase 7"),
            ("12", "DHA Phase 7"),
        ])
    }

    #[inline] pub fn len(&self) -> usize { self.names.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.names.is_empty() }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Look up an attribute value by its text form.
    pub fn name_of(&self, id: &Value) -> Option<&str> {
        self.get(&id_key(id)?)
    }
}

/// Text form of an id attribute; integral floats drop their fraction.
fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(format!("{f:.0}")),
        Value::Float(f) => Some(f.to_string()),
        Value::Text(s) => Some(s.trim().to_string()),
        _ => None,
    }
}
