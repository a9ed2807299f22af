//! Label policy selection.
//!
//! Picks the policy of a service declaration that applies to a session label:
//! - an exact `label` match wins outright;
//! - otherwise the most specific `label_prefix`/`label_suffix` match wins,
//!   longer prefix first, then longer suffix, earlier declaration on ties;
//! - otherwise the `default_policy`.

use hopgate_core::SessionLabel;

use crate::config::{PolicyBody, PolicyRule, ServiceConfig};

/// Selected policy: the rule's target, borrowed from the service document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selected<'a> {
    Rule(&'a PolicyRule),
    Default(&'a PolicyBody),
}

impl<'a> Selected<'a> {
    pub fn child(&self) -> Option<&'a crate::config::ChildTarget> {
        match self {
            Selected::Rule(r) => r.child.as_ref(),
            Selected::Default(b) => b.child.as_ref(),
        }
    }
}

/// Specificity of a matching rule. Compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Score {
    exact: bool,
    prefix_len: usize,
    suffix_len: usize,
}

fn score(rule: &PolicyRule, label: &str) -> Option<Score> {
    if let Some(exact) = &rule.label {
        return (exact == label).then_some(Score {
            exact: true,
            prefix_len: 0,
            suffix_len: 0,
        });
    }

    let prefix_len = match &rule.label_prefix {
        Some(p) if label.starts_with(p.as_str()) => p.len(),
        Some(_) => return None,
        None => 0,
    };
    let suffix_len = match &rule.label_suffix {
        Some(s) if label.ends_with(s.as_str()) => s.len(),
        Some(_) => return None,
        None => 0,
    };
    Some(Score {
        exact: false,
        prefix_len,
        suffix_len,
    })
}

/// Policy of `service` that applies to `label`, or `None` if no policy is
/// defined for it.
pub fn select_policy<'a>(label: &SessionLabel, service: &'a ServiceConfig) -> Option<Selected<'a>> {
    let mut best: Option<(Score, &'a PolicyRule)> = None;
    for rule in &service.policies {
        let Some(s) = score(rule, label.as_str()) else {
            continue;
        };
        if best.map_or(true, |(b, _)| s > b) {
            best = Some((s, rule));
        }
    }

    match best {
        Some((_, rule)) => Some(Selected::Rule(rule)),
        None => service.default_policy.as_ref().map(Selected::Default),
    }
}
