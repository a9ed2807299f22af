//! Route resolution: `(service name, label) -> Route`.
//!
//! Pure function of the policy generation and the child registry. It never
//! mutates either, so the revalidator can call it for every open session
//! after a config change.

use hopgate_core::error::{HopgateError, Result};
use hopgate_core::SessionLabel;

use crate::child::{ChildRegistry, ServiceKey};
use crate::policy::{select_policy, PolicyGeneration};

/// Resolved route of a session request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Backing service the session goes to.
    pub service: ServiceKey,
    /// Label the session is forwarded with.
    pub label: SessionLabel,
    /// Fixed session cost of the backing service.
    pub session_cost: u64,
}

pub fn resolve(
    policy: &PolicyGeneration,
    children: &ChildRegistry,
    service_name: &str,
    label: &SessionLabel,
) -> Result<Route> {
    let entry = policy.service(service_name).ok_or_else(|| {
        HopgateError::ServiceDenied(format!("no declaration of service {service_name:?}"))
    })?;

    let selected = select_policy(label, entry.document()).ok_or_else(|| {
        HopgateError::ServiceDenied(format!("no policy for label {:?}", label.as_str()))
    })?;

    let target = selected.child().ok_or_else(|| {
        HopgateError::ServiceDenied(format!("policy for label {:?} names no child", label.as_str()))
    })?;

    let target_label = target
        .label
        .as_deref()
        .map(SessionLabel::from)
        .unwrap_or_else(|| label.clone());

    let key = ServiceKey::new(service_name, target.name.as_str());
    let child = children
        .get(&key)
        .ok_or_else(|| HopgateError::ServiceDenied(format!("no backing service {key}")))?;

    if child.abandoned() {
        return Err(HopgateError::ServiceDenied(format!("backing service {key} is abandoned")));
    }

    Ok(Route {
        session_cost: child.session_cost(),
        service: key,
        label: target_label,
    })
}
