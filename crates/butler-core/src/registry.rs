//! Environment registry
//!
//! Static name → descriptor mapping, built once at startup and read-only for
//! the rest of the process lifetime.

use crate::{ButlerError, EnvironmentDescriptor, Result};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct EnvironmentRegistry {
    environments: BTreeMap<String, EnvironmentDescriptor>,
}

impl EnvironmentRegistry {
    /// Build a registry, rejecting duplicate names and unusable addresses
    pub fn new(descriptors: impl IntoIterator<Item = EnvironmentDescriptor>) -> Result<Self> {
        let mut environments = BTreeMap::new();

        for env in descriptors {
            if env.name.trim().is_empty() {
                return Err(ButlerError::InvalidConfig(
                    "environment name cannot be empty".to_string(),
                ));
            }
            if env.host.trim().is_empty() {
                return Err(ButlerError::InvalidConfig(format!(
                    "environment {}: host cannot be empty",
                    env.name
                )));
            }
            if env.port == 0 {
                return Err(ButlerError::InvalidConfig(format!(
                    "environment {}: port cannot be 0",
                    env.name
                )));
            }
            if env.database < 0 {
                return Err(ButlerError::InvalidConfig(format!(
                    "environment {}: database index cannot be negative",
                    env.name
                )));
            }
            if env.timeout.is_zero() {
                return Err(ButlerError::InvalidConfig(format!(
                    "environment {}: timeout cannot be 0",
                    env.name
                )));
            }

            let name = env.name.clone();
            if environments.insert(name.clone(), env).is_some() {
                return Err(ButlerError::InvalidConfig(format!(
                    "duplicate environment: {}",
                    name
                )));
            }
        }

        Ok(Self { environments })
    }

    /// Look up the connection parameters for an environment
    pub fn describe(&self, name: &str) -> Result<&EnvironmentDescriptor> {
        self.environments
            .get(name)
            .ok_or_else(|| ButlerError::EnvironmentNotFound(name.to_string()))
    }

    /// Environment names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }
}
