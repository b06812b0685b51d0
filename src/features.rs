//! Feature name registry and binary multi-label encoding.

use crate::error::{KlerosError, KlerosResult};
use std::collections::{BTreeSet, HashMap};

/// Maps feature names to stable column indices in the label vector.
///
/// Column order is the order of the configured feature list and never
/// changes after construction.
#[derive(Debug, Clone)]
pub struct FeatureIndex {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureIndex {
    /// Build from an ordered feature-name list. Duplicates are rejected:
    /// a duplicated name would silently alias two label columns.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> KlerosResult<Self> {
        let mut index = HashMap::with_capacity(names.len());
        let mut ordered = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let name = name.as_ref().to_string();
            if index.insert(name.clone(), i).is_some() {
                return Err(KlerosError::Configuration(format!(
                    "duplicate feature name '{}'",
                    name
                )));
            }
            ordered.push(name);
        }
        Ok(Self {
            names: ordered,
            index,
        })
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(|s| s.as_str())
    }

    pub fn index_of(&self, name: &str) -> KlerosResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| KlerosError::UnknownFeature(name.to_string()))
    }

    /// Binary multi-label vector: 1.0 at each supplied index, 0.0 elsewhere.
    pub fn label_vector_for(&self, feature_ids: &BTreeSet<usize>) -> Vec<f32> {
        let mut labels = vec![0.0f32; self.names.len()];
        for &id in feature_ids {
            debug_assert!(id < labels.len(), "feature id {} out of range", id);
            if let Some(slot) = labels.get_mut(id) {
                *slot = 1.0;
            }
        }
        labels
    }
}
