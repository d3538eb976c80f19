//! Catalog: validated, immutable set of steps.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::model::{Feature, Step};
use crate::error::CatalogError;

/// The workflow definition. Built once at startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Step>", into = "Vec<Step>")]
pub struct Catalog {
    steps: Vec<Step>,
}

impl Catalog {
    /// Validate and index a list of steps. Steps are ordered by number.
    pub fn new(mut steps: Vec<Step>) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::Empty);
        }
        steps.sort_by_key(|s| s.number);

        let mut numbers = HashSet::new();
        let mut all_features = HashSet::new();
        for step in &steps {
            if !numbers.insert(step.number) {
                return Err(CatalogError::DuplicateStep(step.number));
            }
            let mut ids = HashSet::new();
            for feature in &step.features {
                if !ids.insert(feature.id.as_str()) {
                    return Err(CatalogError::DuplicateFeature {
                        step: step.number,
                        feature: feature.id.clone(),
                    });
                }
                all_features.insert(feature.id.as_str());
            }
        }

        for step in &steps {
            for feature in &step.features {
                if let Some(missing) = feature
                    .prerequisites
                    .iter()
                    .find(|p| !all_features.contains(p.as_str()))
                {
                    return Err(CatalogError::UnknownPrerequisite {
                        step: step.number,
                        feature: feature.id.clone(),
                        prerequisite: missing.clone(),
                    });
                }
            }
        }

        Ok(Self { steps })
    }

    /// Parse a catalog from a JSON array of steps.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let steps: Vec<Step> = serde_json::from_str(json)?;
        Self::new(steps)
    }

    /// Load a JSON catalog from disk.
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step_numbers(&self) -> Vec<u32> {
        self.steps.iter().map(|s| s.number).collect()
    }

    pub fn first_step(&self) -> u32 {
        // `new` rejects empty catalogs.
        self.steps[0].number
    }

    pub fn contains(&self, number: u32) -> bool {
        self.step(number).is_some()
    }

    pub fn step(&self, number: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.number == number)
    }

    pub fn feature(&self, number: u32, feature_id: &str) -> Option<&Feature> {
        self.step(number)?.feature(feature_id)
    }

    pub fn first_feature(&self, number: u32) -> Option<&Feature> {
        self.step(number)?.first_feature()
    }

    /// The step following `number` in sequence.
    pub fn next_step(&self, number: u32) -> Option<u32> {
        self.steps
            .iter()
            .map(|s| s.number)
            .find(|n| *n > number)
    }

    /// The step whose route path equals `path`. Query fragments are ignored.
    pub fn step_for_path(&self, path: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.location().path == path)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl TryFrom<Vec<Step>> for Catalog {
    type Error = CatalogError;

    fn try_from(steps: Vec<Step>) -> Result<Self, Self::Error> {
        Self::new(steps)
    }
}

impl From<Catalog> for Vec<Step> {
    fn from(catalog: Catalog) -> Self {
        catalog.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(number: u32, route: &str, features: &[&str]) -> Step {
        features.iter().fold(Step::new(number, "step", route), |s, id| {
            s.with_feature(Feature::direct(id, id, &format!("#{id}")))
        })
    }

    #[test]
    fn sorts_steps_by_number() {
        let catalog = Catalog::new(vec![step(3, "/c", &[]), step(1, "/a", &[]), step(2, "/b", &[])]).unwrap();
        assert_eq!(catalog.step_numbers(), vec![1, 2, 3]);
        assert_eq!(catalog.first_step(), 1);
        assert_eq!(catalog.next_step(1), Some(2));
        assert_eq!(catalog.next_step(3), None);
    }

    #[test]
    fn rejects_empty_and_duplicates() {
        assert!(matches!(Catalog::new(vec![]), Err(CatalogError::Empty)));
        assert!(matches!(
            Catalog::new(vec![step(1, "/a", &[]), step(1, "/b", &[])]),
            Err(CatalogError::DuplicateStep(1))
        ));
        assert!(matches!(
            Catalog::new(vec![step(1, "/a", &["x", "x"])]),
            Err(CatalogError::DuplicateFeature { step: 1, .. })
        ));
    }

    #[test]
    fn rejects_unknown_prerequisite() {
        let s = Step::new(1, "s", "/a")
            .with_feature(Feature::direct("b", "b", "#b").requires(&["missing"]));
        let err = Catalog::new(vec![s]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownPrerequisite { ref prerequisite, .. } if prerequisite == "missing"));
    }

    #[test]
    fn same_feature_id_allowed_in_different_steps() {
        let catalog = Catalog::new(vec![step(1, "/a", &["create"]), step(2, "/b", &["create"])]);
        assert!(catalog.is_ok());
    }

    #[test]
    fn step_for_path_ignores_query() {
        let catalog = Catalog::new(vec![step(1, "/a", &[]), step(2, "/metrics?tab=model", &[])]).unwrap();
        assert_eq!(catalog.step_for_path("/metrics").map(|s| s.number), Some(2));
        assert!(catalog.step_for_path("/nowhere").is_none());
    }

    #[test]
    fn json_catalog_is_validated() {
        let json = r##"[
            {"number": 1, "title": "One", "route": "/one", "features": [
                {"id": "go", "name": "Go", "selector": "#go", "action": "navigation"}
            ]},
            {"number": 1, "title": "Dup", "route": "/dup"}
        ]"##;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::DuplicateStep(1))));

        let valid = r#"[{"number": 4, "title": "Four", "route": "/four"}]"#;
        let catalog = Catalog::from_json(valid).unwrap();
        assert_eq!(catalog.first_step(), 4);
        assert!(catalog.first_feature(4).is_none());
    }
}
