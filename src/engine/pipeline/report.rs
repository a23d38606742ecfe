use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The slice of a report definition the loader needs: where the rows come
/// from, how they are grouped, and which params narrow them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    pub resource: String,
    /// Outermost group first.
    #[serde(default)]
    pub group_fields: Vec<String>,
    #[serde(default)]
    pub sort: Vec<String>,
    /// Params that become equality filters on the field of the same name.
    #[serde(default)]
    pub filter_params: Vec<String>,
    #[serde(default)]
    pub required_params: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<String>,
}

impl Report {
    pub fn new(name: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort.push(field.into());
        self
    }

    pub fn filter_param(mut self, name: impl Into<String>) -> Self {
        self.filter_params.push(name.into());
        self
    }

    pub fn require_param(mut self, name: impl Into<String>) -> Self {
        self.required_params.push(name.into());
        self
    }

    pub fn with_relationships<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationships = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("report has no name".to_string());
        }
        if self.resource.trim().is_empty() {
            return Err(format!("report '{}' has no resource", self.name));
        }

        let mut seen = HashSet::new();
        for field in &self.group_fields {
            if field.trim().is_empty() {
                return Err(format!("report '{}' has an empty group field", self.name));
            }
            if !seen.insert(field.as_str()) {
                return Err(format!(
                    "report '{}' groups by '{}' twice",
                    self.name, field
                ));
            }
        }
        Ok(())
    }
}
