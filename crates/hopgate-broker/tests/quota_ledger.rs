#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use common::{close, create, upgrade, Harness};
use hopgate_broker::child::ChildService;
use hopgate_broker::quota::{split_session_quota, RamAccount};
use hopgate_core::error::HopgateError;

#[test]
fn transfer_is_all_or_nothing() {
    let mut broker = RamAccount::new("broker", 1000);
    let mut child = RamAccount::new("child", 0);

    broker.transfer(&mut child, 600).unwrap();
    assert_eq!((broker.avail(), child.avail()), (400, 600));

    let err = broker.transfer(&mut child, 401).unwrap_err();
    assert!(matches!(err, HopgateError::TransferFailed { amount: 401, available: 400 }));
    assert_eq!((broker.avail(), child.avail()), (400, 600));

    let mut full = RamAccount::new("full", u64::MAX);
    assert!(broker.transfer(&mut full, 1).is_err());
    assert_eq!(broker.avail(), 400);
}

#[test]
fn split_keeps_session_cost() {
    let split = split_session_quota(4096, 1024).unwrap();
    assert_eq!(split.requested, 4096);
    assert_eq!(split.forwarded, 3072);
    assert_eq!(split.cost, 1024);

    assert_eq!(split_session_quota(1024, 1024).unwrap().forwarded, 0);
    assert!(matches!(split_session_quota(1023, 1024), Err(HopgateError::QuotaExceeded(_))));
}

#[test]
fn quota_is_conserved_across_a_session_lifetime() {
    let mut h = Harness::new(common::NIC_TO_DRIVER);
    let total = |h: &Harness| {
        h.broker_ram()
            + h.state
                .dispatcher()
                .children()
                .iter()
                .map(|c| c.ram().avail())
                .sum::<u64>()
    };

    h.submit(10_000, vec![create(1, "Nic", 4096, "a"), create(2, "Nic", 4096, "b")]);
    assert_eq!(total(&h), 10_000);
    h.poll();

    h.submit(500, vec![upgrade(1, 500), close(2)]);
    assert_eq!(total(&h), 10_500);
    h.poll();

    h.submit(0, vec![close(1)]);
    h.poll();
    assert_eq!(total(&h), 10_500);
    assert_eq!(h.child_ram("Nic", "driver"), 2 * 1024);
    assert_eq!(h.broker_ram(), 10_500 - 2 * 1024);
}
