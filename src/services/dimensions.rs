//! Lookup of configured scoring dimensions.

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DimensionConfig, FieldKey};

/// The configured scoring dimensions, in configuration order.
#[derive(Debug, Clone)]
pub struct DimensionCatalog {
    dimensions: Vec<DimensionConfig>,
}

impl Default for DimensionCatalog {
    fn default() -> Self {
        Self::new(DimensionConfig::builtins())
    }
}

impl DimensionCatalog {
    pub fn new(dimensions: Vec<DimensionConfig>) -> Self {
        Self { dimensions }
    }

    /// Look up a dimension; unknown names are a configuration error.
    pub fn get(&self, name: &str) -> DomainResult<&DimensionConfig> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| DomainError::UnknownDimension(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DimensionConfig> {
        self.dimensions.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.dimensions.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

/// Parsed `(field, weight)` pairs of a dimension; malformed keys are skipped.
pub fn weighted_fields(dimension: &DimensionConfig) -> Vec<(FieldKey, f64)> {
    dimension
        .signal_weights
        .iter()
        .filter_map(|(key, weight)| match FieldKey::parse(key) {
            Some(field) => Some((field, *weight)),
            None => {
                tracing::debug!(dimension = %dimension.name, key = %key, "ignoring malformed weight key");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_dimension_is_configuration_error() {
        let catalog = DimensionCatalog::default();
        assert_eq!(catalog.len(), 5);
        assert!(catalog.get("escalation_risk").is_ok());
        match catalog.get("charisma") {
            Err(DomainError::UnknownDimension(name)) => assert_eq!(name, "charisma"),
            other => panic!("expected UnknownDimension, got {other:?}"),
        }
    }

    #[test]
    fn test_weighted_fields_skip_malformed_keys() {
        let mut dim = DimensionConfig::builtins().remove(0);
        dim.signal_weights.insert("bogus".to_string(), 1.0);
        let fields = weighted_fields(&dim);
        assert_eq!(fields.len(), 3);
    }
}
