use std::collections::HashSet;

use serde::Deserialize;
use hopgate_core::error::{HopgateError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    pub version: u32,

    #[serde(default)]
    pub broker: BrokerSection,

    /// Services offered to the parent, each with its routing policy.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    /// Loopback backing services started with the broker.
    #[serde(default)]
    pub children: Vec<ChildConfig>,
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(HopgateError::UnsupportedVersion);
        }

        self.broker.validate()?;

        let mut names = HashSet::new();
        for svc in &self.services {
            svc.validate()?;
            if !names.insert(svc.name.as_str()) {
                return Err(HopgateError::BadRequest(format!(
                    "service {} declared more than once",
                    svc.name
                )));
            }
        }

        let mut children = HashSet::new();
        for child in &self.children {
            child.validate()?;
            if !children.insert(child.name.as_str()) {
                return Err(HopgateError::BadRequest(format!(
                    "child {} declared more than once",
                    child.name
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerSection {
    /// Quota granted by the parent at startup.
    #[serde(default)]
    pub ram_quota: u64,

    /// How often the binary collects responses from backing services.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            ram_quota: 0,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl BrokerSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=60000).contains(&self.poll_interval_ms) {
            return Err(HopgateError::BadRequest(
                "broker.poll_interval_ms must be between 1 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_poll_interval_ms() -> u64 {
    10
}

/// One `services` entry: the buffered policy document of a service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub name: String,

    #[serde(default)]
    pub policies: Vec<PolicyRule>,

    /// Applies when no policy matches the label.
    #[serde(default)]
    pub default_policy: Option<PolicyBody>,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(HopgateError::BadRequest("service name must not be empty".into()));
        }
        for rule in &self.policies {
            rule.validate(&self.name)?;
        }
        if let Some(child) = self.default_policy.as_ref().and_then(|p| p.child.as_ref()) {
            child.validate(&self.name)?;
        }
        Ok(())
    }
}

/// Label-matching policy. Either `label` alone, or `label_prefix` and/or
/// `label_suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRule {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub label_prefix: Option<String>,
    #[serde(default)]
    pub label_suffix: Option<String>,
    #[serde(default)]
    pub child: Option<ChildTarget>,
}

impl PolicyRule {
    fn validate(&self, service: &str) -> Result<()> {
        let affix = self.label_prefix.is_some() || self.label_suffix.is_some();
        match (&self.label, affix) {
            (Some(_), true) => Err(HopgateError::BadRequest(format!(
                "service {service}: policy combines label with label_prefix/label_suffix"
            ))),
            (None, false) => Err(HopgateError::BadRequest(format!(
                "service {service}: policy needs label, label_prefix or label_suffix"
            ))),
            _ => match &self.child {
                Some(child) => child.validate(service),
                None => Ok(()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyBody {
    #[serde(default)]
    pub child: Option<ChildTarget>,
}

/// Target of a policy: the child providing the service, and an optional label
/// the session is forwarded with instead of the client's.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChildTarget {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl ChildTarget {
    fn validate(&self, service: &str) -> Result<()> {
        if self.name.is_empty() {
            return Err(HopgateError::BadRequest(format!(
                "service {service}: policy child name must not be empty"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChildConfig {
    pub name: String,

    /// Service names this child provides.
    #[serde(default)]
    pub provides: Vec<String>,

    /// Share of each session's quota kept for bookkeeping.
    #[serde(default)]
    pub session_cost: u64,

    /// Initial quota of the child's own account.
    #[serde(default)]
    pub ram_quota: u64,

    #[serde(default)]
    pub response: ResponseMode,
}

impl ChildConfig {
    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(HopgateError::BadRequest("child name must not be empty".into()));
        }
        if self.provides.iter().any(|s| s.is_empty()) {
            return Err(HopgateError::BadRequest(format!(
                "child {}: provided service names must not be empty",
                self.name
            )));
        }
        Ok(())
    }
}

/// How a loopback child answers session requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Sessions become available during initiation.
    Immediate,
    /// Sessions become available once the child is polled after a wakeup.
    #[default]
    Deferred,
    /// Creation is refused during initiation.
    Deny,
    /// Creation fails for lack of quota during initiation.
    Exceed,
    /// Creation is refused once the child is polled.
    DeferredDeny,
    /// Creation fails for lack of quota once the child is polled.
    DeferredExceed,
}
