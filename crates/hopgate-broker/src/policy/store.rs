use std::sync::Arc;

use crate::config::ServiceConfig;

/// Policy entry: one declared service and its buffered policy document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePolicy {
    document: ServiceConfig,
}

impl ServicePolicy {
    pub fn new(document: ServiceConfig) -> Self {
        Self { document }
    }

    pub fn name(&self) -> &str {
        &self.document.name
    }

    pub fn document(&self) -> &ServiceConfig {
        &self.document
    }
}

/// Immutable set of policy entries built from one config.
/// Construct completely, then swap into the [`PolicyStore`].
#[derive(Debug, Default)]
pub struct PolicyGeneration {
    number: u64,
    services: Vec<ServicePolicy>,
}

impl PolicyGeneration {
    pub fn number(&self) -> u64 {
        self.number
    }

    /// First (and, after config validation, only) entry named `name`.
    pub fn service(&self, name: &str) -> Option<&ServicePolicy> {
        self.services.iter().find(|s| s.name() == name)
    }

    pub fn services(&self) -> &[ServicePolicy] {
        &self.services
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Holder of the current policy generation.
#[derive(Debug, Default)]
pub struct PolicyStore {
    current: Arc<PolicyGeneration>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<PolicyGeneration> {
        Arc::clone(&self.current)
    }

    pub fn generation(&self) -> &PolicyGeneration {
        &self.current
    }

    /// Build the next generation from `services` and replace the current one.
    /// Returns the new generation number.
    pub fn rebuild(&mut self, services: &[ServiceConfig]) -> u64 {
        let next = PolicyGeneration {
            number: self.current.number + 1,
            services: services.iter().cloned().map(ServicePolicy::new).collect(),
        };
        self.current = Arc::new(next);
        self.current.number
    }
}
