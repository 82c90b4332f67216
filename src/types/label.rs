//! Class labels and their semantic names

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A class identifier as predicted by the model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Int(i64),
    Text(String),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassLabel::Int(v) => write!(f, "{}", v),
            ClassLabel::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ClassLabel {
    fn from(v: i64) -> Self {
        ClassLabel::Int(v)
    }
}

impl From<&str> for ClassLabel {
    fn from(s: &str) -> Self {
        ClassLabel::Text(s.to_string())
    }
}

/// One configured `label -> name` pair.
///
/// The label is kept as a value rather than a table key so its case survives
/// layered configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub label: ClassLabel,
    pub name: String,
}

impl LabelEntry {
    pub fn new(label: impl Into<ClassLabel>, name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
        }
    }
}

/// Static mapping from a label's string form to a human-readable class name
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    names: HashMap<String, String>,
}

impl LabelMap {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// Build from configured entries; a later entry for the same label wins
    pub fn from_entries(entries: &[LabelEntry]) -> Self {
        let names = entries
            .iter()
            .map(|e| (e.label.to_string(), e.name.clone()))
            .collect();
        Self { names }
    }

    /// Name for `label`, or the label's own string form when unmapped
    pub fn name_of(&self, label: &ClassLabel) -> String {
        let key = label.to_string();
        match self.names.get(&key) {
            Some(name) => name.clone(),
            None => key,
        }
    }

    pub fn names_of(&self, labels: &[ClassLabel]) -> Vec<String> {
        labels.iter().map(|l| self.name_of(l)).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Breast cancer dataset classes: 0 = malignant, 1 = benign
pub fn default_label_entries() -> Vec<LabelEntry> {
    vec![
        LabelEntry::new(ClassLabel::Int(0), "malignant"),
        LabelEntry::new(ClassLabel::Int(1), "benign"),
    ]
}

impl Default for LabelMap {
    fn default() -> Self {
        Self::from_entries(&default_label_entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapped_labels_use_semantic_name() {
        let map = LabelMap::default();
        assert_eq!(map.name_of(&ClassLabel::Int(0)), "malignant");
        assert_eq!(map.name_of(&ClassLabel::Int(1)), "benign");
    }

    #[test]
    fn test_unmapped_labels_pass_through() {
        let map = LabelMap::default();
        assert_eq!(map.name_of(&ClassLabel::Int(7)), "7");
        assert_eq!(map.name_of(&ClassLabel::Int(-1)), "-1");
        assert_eq!(map.name_of(&ClassLabel::from("setosa")), "setosa");
    }

    #[test]
    fn test_text_labels_match_string_keys() {
        let mut names = HashMap::new();
        names.insert("spam".to_string(), "junk mail".to_string());
        let map = LabelMap::new(names);
        assert_eq!(map.name_of(&ClassLabel::from("spam")), "junk mail");
        assert_eq!(
            map.names_of(&[ClassLabel::from("spam"), ClassLabel::from("ham")]),
            vec!["junk mail".to_string(), "ham".to_string()]
        );
    }

    #[test]
    fn test_entries_keep_label_case() {
        let map = LabelMap::from_entries(&[
            LabelEntry::new("Setosa", "iris setosa"),
            LabelEntry::new("M", "malignant"),
        ]);
        assert_eq!(map.name_of(&ClassLabel::from("Setosa")), "iris setosa");
        assert_eq!(map.name_of(&ClassLabel::from("M")), "malignant");
        assert_eq!(map.name_of(&ClassLabel::from("setosa")), "setosa");
    }

    #[test]
    fn test_text_and_int_entries_share_keys() {
        let map = LabelMap::from_entries(&[LabelEntry::new("2", "virginica")]);
        assert_eq!(map.name_of(&ClassLabel::Int(2)), "virginica");
    }

    #[test]
    fn test_label_serialization_is_untagged() {
        let labels = vec![ClassLabel::Int(1), ClassLabel::from("b")];
        let json = serde_json::to_string(&labels).unwrap();
        assert_eq!(json, r#"[1,"b"]"#);
    }
}
