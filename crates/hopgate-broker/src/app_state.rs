//! Broker state built from a config.
//!
//! Wires the loopback children, the dispatcher and the policy of a
//! [`BrokerConfig`], and reconciles children on reload.

use std::collections::BTreeSet;

use tracing::{info, warn};

use hopgate_core::error::{HopgateError, Result};
use hopgate_core::SessionId;

use crate::child::{ChildRegistry, ChildService, LoopbackChild, ServiceKey};
use crate::config::BrokerConfig;
use crate::dispatch::Dispatcher;
use crate::obs::ReportUpdateTrigger;
use crate::parent::ParentProxy;

const FAIL_FAST_ON_MISMATCH: bool = false; // if changed to true, boot fails.

pub struct AppState<P: ParentProxy> {
    cfg: BrokerConfig,
    dispatcher: Dispatcher<P>,
}

impl<P: ParentProxy> AppState<P> {
    /// Build broker state. Returns Result so main can handle errors gracefully.
    pub fn new(cfg: BrokerConfig, parent: P, report: ReportUpdateTrigger) -> Result<Self> {
        check_routes(&cfg)?;

        let mut children = ChildRegistry::new();
        for child in &cfg.children {
            for svc in LoopbackChild::from_config(child) {
                children.register(Box::new(svc));
            }
        }

        let mut dispatcher = Dispatcher::new(children, parent, report);
        dispatcher.receive_quota(cfg.broker.ram_quota);
        dispatcher.apply_config(&cfg.services);

        Ok(Self { cfg, dispatcher })
    }

    pub fn cfg(&self) -> &BrokerConfig {
        &self.cfg
    }

    pub fn dispatcher(&self) -> &Dispatcher<P> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<P> {
        &mut self.dispatcher
    }

    /// Apply a changed config. Children no longer declared are abandoned,
    /// newly declared ones are started, then the policy is rebuilt and open
    /// sessions are revalidated. Returns the sessions being closed.
    pub fn reload(&mut self, cfg: BrokerConfig) -> Result<Vec<SessionId>> {
        check_routes(&cfg)?;

        if cfg.broker.ram_quota != self.cfg.broker.ram_quota {
            warn!("broker.ram_quota only takes effect at startup");
        }
        if cfg.broker.poll_interval_ms != self.cfg.broker.poll_interval_ms {
            warn!("broker.poll_interval_ms only takes effect at startup");
        }

        let declared: BTreeSet<ServiceKey> = cfg
            .children
            .iter()
            .flat_map(|c| c.provides.iter().map(move |svc| ServiceKey::new(svc, &c.name)))
            .collect();

        for key in self.dispatcher.children().keys() {
            if declared.contains(&key) {
                continue;
            }
            if let Some(svc) = self.dispatcher.children_mut().get_mut(&key) {
                if !svc.abandoned() {
                    info!(service = %key, "child no longer declared, abandoning its service");
                    svc.abandon();
                }
            }
        }

        for child in &cfg.children {
            let changed = self.cfg.children.iter().any(|old| {
                old.name == child.name
                    && (old.session_cost != child.session_cost
                        || old.ram_quota != child.ram_quota
                        || old.response != child.response)
            });
            for svc in LoopbackChild::from_config(child) {
                self.start_service(svc, changed);
            }
        }

        let closed = self.dispatcher.apply_config(&cfg.services);
        self.cfg = cfg;
        Ok(closed)
    }

    fn start_service(&mut self, svc: LoopbackChild, settings_changed: bool) {
        let key = svc.key();
        let abandoned = match self.dispatcher.children().get(&key) {
            None => {
                info!(service = %key, "starting service");
                self.dispatcher.children_mut().register(Box::new(svc));
                return;
            }
            Some(existing) => existing.abandoned(),
        };
        if !abandoned {
            if settings_changed {
                warn!(service = %key, "running service keeps its previous session_cost, ram_quota and response");
            }
            return;
        }

        let in_use = self.dispatcher.sessions().iter().any(|s| *s.service() == key);
        if in_use {
            warn!(service = %key, "abandoned service still has sessions, not restarting it");
            return;
        }
        info!(service = %key, "restarting abandoned service");
        self.dispatcher.children_mut().register(Box::new(svc));
    }
}

/// Policy <-> children sanity check.
fn check_routes(cfg: &BrokerConfig) -> Result<()> {
    for svc in &cfg.services {
        let targets = svc
            .policies
            .iter()
            .filter_map(|p| p.child.as_ref())
            .chain(svc.default_policy.as_ref().and_then(|p| p.child.as_ref()));

        for target in targets {
            let provided = cfg
                .children
                .iter()
                .any(|c| c.name == target.name && c.provides.contains(&svc.name));
            if provided {
                continue;
            }
            warn!(service = %svc.name, child = %target.name, "policy routes to a child that does not provide the service");
            if FAIL_FAST_ON_MISMATCH {
                return Err(HopgateError::BadRequest(format!(
                    "service {} routes to child {} which does not provide it",
                    svc.name, target.name
                )));
            }
        }
    }
    Ok(())
}
