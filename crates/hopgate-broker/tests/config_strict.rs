#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use hopgate_broker::config::{self, ResponseMode};
use hopgate_core::error::HopgateError;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
services:
  - name: Nic
    default_policy:
      chlid: { name: driver } # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(matches!(err, HopgateError::BadRequest(_)));
    assert_eq!(err.response_code().as_str(), "INVALID_ARGS");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
services:
  - name: Nic
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.services[0].name, "Nic");
    assert!(cfg.services[0].policies.is_empty());
    assert!(cfg.services[0].default_policy.is_none());
    assert_eq!(cfg.broker.ram_quota, 0);
    assert_eq!(cfg.broker.poll_interval_ms, 10);
    assert!(cfg.children.is_empty());
}

#[test]
fn child_defaults_to_deferred_answers() {
    let ok = r#"
version: 1
children:
  - name: driver
    provides: [Nic, Block]
    session_cost: 1K
"#;
    // sizes in the config are plain integers
    assert!(config::load_from_str(ok).is_err());

    let ok = ok.replace("1K", "1024");
    let cfg = config::load_from_str(&ok).expect("must parse");
    assert_eq!(cfg.children[0].provides, vec!["Nic", "Block"]);
    assert_eq!(cfg.children[0].session_cost, 1024);
    assert_eq!(cfg.children[0].response, ResponseMode::Deferred);
}

#[test]
fn unsupported_version_rejected() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert!(matches!(err, HopgateError::UnsupportedVersion));
}

#[test]
fn duplicate_service_rejected() {
    let bad = r#"
version: 1
services:
  - name: Nic
  - name: Nic
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn duplicate_child_rejected() {
    let bad = r#"
version: 1
children:
  - name: driver
    provides: [Nic]
  - name: driver
    provides: [Block]
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn policy_needs_exactly_one_matching_form() {
    let both = r#"
version: 1
services:
  - name: Nic
    policies:
      - label: "a"
        label_prefix: "a"
        child: { name: driver }
"#;
    assert!(config::load_from_str(both).is_err());

    let neither = r#"
version: 1
services:
  - name: Nic
    policies:
      - child: { name: driver }
"#;
    assert!(config::load_from_str(neither).is_err());

    let affixes = r#"
version: 1
services:
  - name: Nic
    policies:
      - label_prefix: "sandbox"
        label_suffix: "-> nic"
        child: { name: driver, label: "sb" }
"#;
    let cfg = config::load_from_str(affixes).expect("prefix and suffix combine");
    let child = cfg.services[0].policies[0].child.as_ref().unwrap();
    assert_eq!(child.name, "driver");
    assert_eq!(child.label.as_deref(), Some("sb"));
}

#[test]
fn empty_child_target_rejected() {
    let bad = r#"
version: 1
services:
  - name: Nic
    default_policy:
      child: { name: "" }
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn poll_interval_bounds() {
    let bad = r#"
version: 1
broker:
  poll_interval_ms: 0
"#;
    assert!(config::load_from_str(bad).is_err());

    let ok = r#"
version: 1
broker:
  ram_quota: 65536
  poll_interval_ms: 250
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.broker.ram_quota, 65536);
    assert_eq!(cfg.broker.poll_interval_ms, 250);
}

#[test]
fn sample_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../hopgate.yaml");
    let cfg = config::load_from_file(path).expect("sample config must load");
    assert!(cfg.services.iter().any(|s| s.name == "Nic"));
}
