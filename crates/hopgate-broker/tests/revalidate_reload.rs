#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use common::{create, is_cap, response, Harness};
use hopgate_broker::session::Phase;
use hopgate_core::protocol::response::ResponseCode;
use hopgate_core::SessionLabel;

const TWO_LABELS: &str = r#"
version: 1
services:
  - name: Nic
    policies:
      - label: "a"
        child: { name: drv_a }
      - label: "b"
        child: { name: drv_a }
children:
  - name: drv_a
    provides: [Nic]
    session_cost: 1024
    response: immediate
  - name: drv_b
    provides: [Nic]
    session_cost: 1024
    response: immediate
"#;

fn opened(yaml: &str) -> Harness {
    let mut h = Harness::new(yaml);
    h.submit(8192, vec![create(1, "Nic", 4096, "a"), create(2, "Nic", 4096, "b")]);
    let events = h.take_events();
    assert!(is_cap(&events[0], 1));
    assert!(is_cap(&events[1], 2));
    h
}

#[test]
fn reload_of_same_config_closes_nothing() {
    let mut h = opened(TWO_LABELS);
    let gen = h.state.dispatcher().policy().generation().number();

    assert!(h.reload(TWO_LABELS).is_empty());
    assert!(h.reload(TWO_LABELS).is_empty());

    assert_eq!(h.state.dispatcher().policy().generation().number(), gen + 2);
    for id in [1, 2] {
        let s = h.session(id).unwrap();
        assert_eq!(s.phase, Phase::CapHandedOut);
        assert_eq!(s.donated_ram_quota(), 3072);
    }
    assert_eq!(h.poll(), 0);
    assert!(h.events().is_empty());
}

#[test]
fn only_sessions_with_changed_route_are_closed() {
    let mut h = opened(TWO_LABELS);
    let changed = TWO_LABELS.replacen(
        "label: \"b\"\n        child: { name: drv_a }",
        "label: \"b\"\n        child: { name: drv_b }",
        1,
    );
    assert_ne!(changed, TWO_LABELS);

    let closed = h.reload(&changed);
    assert_eq!(closed.iter().map(|id| id.value()).collect::<Vec<_>>(), vec![2]);
    assert_eq!(h.session(1).unwrap().phase, Phase::CapHandedOut);
    assert_eq!(h.session(2).unwrap().phase, Phase::CloseRequested);

    h.poll();
    assert_eq!(h.events(), &[response(2, ResponseCode::Closed)]);
    assert!(h.session(2).is_none());
}

#[test]
fn label_rewrite_change_closes_session() {
    let mut h = opened(TWO_LABELS);
    let changed = TWO_LABELS.replacen(
        "label: \"a\"\n        child: { name: drv_a }",
        "label: \"a\"\n        child: { name: drv_a, label: \"rewritten\" }",
        1,
    );

    let closed = h.reload(&changed);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].value(), 1);
}

#[test]
fn removed_policy_closes_session() {
    let mut h = opened(TWO_LABELS);
    let without_b = r#"
version: 1
services:
  - name: Nic
    policies:
      - label: "a"
        child: { name: drv_a }
children:
  - name: drv_a
    provides: [Nic]
    session_cost: 1024
    response: immediate
  - name: drv_b
    provides: [Nic]
    session_cost: 1024
    response: immediate
"#;
    let closed = h.reload(without_b);
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].value(), 2);
}

#[test]
fn closing_and_denied_sessions_are_not_revalidated() {
    let yaml = r#"
version: 1
services:
  - name: Nic
    policies:
      - label: "ok"
        child: { name: drv }
      - label: "no"
        child: { name: refuser }
children:
  - name: drv
    provides: [Nic]
    response: deferred
  - name: refuser
    provides: [Nic]
    response: deny
"#;
    let mut h = Harness::new(yaml);
    h.submit(
        8192,
        vec![create(1, "Nic", 4096, "ok"), create(2, "Nic", 4096, "no")],
    );
    h.submit(0, vec![common::close(1)]);
    assert_eq!(h.session(1).unwrap().phase, Phase::CloseRequested);
    assert_eq!(h.session(2).unwrap().phase, Phase::InvalidArgs);

    let empty = r#"
version: 1
services:
  - name: Block
children:
  - name: drv
    provides: [Nic]
  - name: refuser
    provides: [Nic]
"#;
    assert!(h.reload(empty).is_empty());
    assert_eq!(h.session(2).unwrap().phase, Phase::InvalidArgs);
}

#[test]
fn undeclared_child_is_abandoned() {
    let mut h = opened(TWO_LABELS);
    let only_b = r#"
version: 1
services:
  - name: Nic
    policies:
      - label: "a"
        child: { name: drv_b }
      - label: "b"
        child: { name: drv_b }
children:
  - name: drv_b
    provides: [Nic]
    session_cost: 1024
    response: immediate
"#;
    let closed = h.reload(only_b);
    assert_eq!(closed.len(), 2);

    let drv_a = hopgate_broker::child::ServiceKey::new("Nic", "drv_a");
    assert!(h.state.dispatcher().children().get(&drv_a).unwrap().abandoned());

    // an abandoned child still answers the close requests already sent
    h.poll();
    assert_eq!(h.events().len(), 2);
    assert!(h.state.dispatcher().sessions().is_empty());
    assert_eq!(h.broker_ram(), 2 * 3072);

    h.take_events();
    h.submit(4096, vec![create(3, "Nic", 4096, "a")]);
    assert_eq!(h.session(3).unwrap().service().child, "drv_b");
}

#[test]
fn abandoned_child_restarts_once_unused() {
    let mut h = opened(TWO_LABELS);
    let drv_a = hopgate_broker::child::ServiceKey::new("Nic", "drv_a");
    let without_a = r#"
version: 1
services:
  - name: Nic
children:
  - name: drv_b
    provides: [Nic]
"#;
    h.reload(without_a);
    assert!(h.state.dispatcher().children().get(&drv_a).unwrap().abandoned());

    // sessions still bound: not restarted
    h.reload(TWO_LABELS);
    assert!(h.state.dispatcher().children().get(&drv_a).unwrap().abandoned());

    h.poll();
    assert!(h.state.dispatcher().sessions().is_empty());
    h.reload(TWO_LABELS);
    assert!(!h.state.dispatcher().children().get(&drv_a).unwrap().abandoned());
}

#[test]
fn requests_wait_for_first_service_declaration() {
    let idle = r#"
version: 1
children:
  - name: driver
    provides: [Nic]
    session_cost: 1024
    response: immediate
"#;
    let mut h = Harness::new(idle);
    assert!(h.state.dispatcher().listener().is_none());

    h.submit(4096, vec![create(1, "Nic", 4096, "client")]);
    assert!(h.events().is_empty());
    assert_eq!(h.broker_ram(), 0);

    let serving = format!(
        "{idle}services:\n  - name: Nic\n    default_policy:\n      child: {{ name: driver }}\n"
    );
    h.reload(&serving);

    let listener = h.state.dispatcher().listener().expect("provisioned");
    assert_eq!(listener.batches, 1);
    assert!(is_cap(&h.events()[0], 1));

    let provisioned_at = listener.provisioned_at;
    h.reload(&serving);
    assert_eq!(h.state.dispatcher().listener().unwrap().provisioned_at, provisioned_at);
}

#[test]
fn running_child_keeps_its_settings_across_reload() {
    let mut h = opened(TWO_LABELS);
    let changed = TWO_LABELS
        .replace("session_cost: 1024", "session_cost: 2048")
        .replace("response: immediate", "response: deny");
    let changed = format!("{changed}broker:\n  poll_interval_ms: 500\n");

    assert!(h.reload(&changed).is_empty());
    assert_eq!(h.state.cfg().broker.poll_interval_ms, 500);

    let route = h
        .state
        .dispatcher()
        .resolve("Nic", &SessionLabel::from("a"))
        .unwrap();
    assert_eq!(route.session_cost, 1024);

    h.submit(4096, vec![create(3, "Nic", 4096, "a")]);
    assert!(is_cap(&h.events()[0], 3));
    assert_eq!(h.session(3).unwrap().donated_ram_quota(), 3072);
}
