//! Checkout, checkin, close.
//!
//! Rules covered:
//! - 5. Append 15, checkout 10, close 10, size 5
//! - 6. A second checkout while one is outstanding fails
//! - 7. Checkin never deletes; items are re-read by the next checkout
//! - 8. Close with a foreign buffer id fails and deletes nothing
//! - 9. Close with no checkout outstanding fails with NotCheckedOut
//! - 10. Close with an empty id list still releases the token
//! - 11. A reconstructed buffer (id only) can close a live checkout

use super::harness::memory_queue;
use crate::{Buffer, QueueError};
use serde_json::json;

/// Rule 5: Append 15, checkout 10, close 10, size 5
#[test]
fn rule_5_scenario_fifteen_items() {
    let queue = memory_queue("sync");
    let ids: Vec<_> = (0..15)
        .map(|i| queue.append(&json!(["action", [i]])).unwrap())
        .collect();

    let buffer = queue.checkout(None).unwrap().unwrap();
    assert_eq!(buffer.item_ids(), ids[..10].to_vec());

    queue.close(&buffer, &buffer.item_ids()).unwrap();
    assert_eq!(queue.size().unwrap(), 5);
    assert!(queue.checkout_token().unwrap().is_none());
}

/// Rule 6: A second checkout while one is outstanding fails
#[test]
fn rule_6_second_checkout_fails() {
    let queue = memory_queue("sync");
    queue.append(&json!(1)).unwrap();

    let first = queue.checkout(None).unwrap().unwrap();
    let err = queue.checkout(None).unwrap_err();
    assert!(matches!(err, QueueError::AlreadyCheckedOut { .. }));
    assert_eq!(err.kind(), "already_checked_out");

    assert_eq!(queue.checkout_token().unwrap().as_deref(), Some(first.id()));
}

/// Rule 6: Appends keep working while a buffer is outstanding
#[test]
fn rule_6_appends_not_blocked_by_checkout() {
    let queue = memory_queue("sync");
    queue.append(&json!(1)).unwrap();
    let _buffer = queue.checkout(None).unwrap().unwrap();

    queue.append(&json!(2)).unwrap();
    assert_eq!(queue.size().unwrap(), 2);
}

/// Rule 7: Checkin never deletes; items are re-read by the next checkout
#[test]
fn rule_7_checkin_keeps_items() {
    let queue = memory_queue("sync");
    for i in 0..3 {
        queue.append(&json!(i)).unwrap();
    }

    let first = queue.checkout(None).unwrap().unwrap();
    queue.checkin(&first).unwrap();
    assert_eq!(queue.size().unwrap(), 3);

    let second = queue.checkout(None).unwrap().unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(first.item_ids(), second.item_ids());
}

/// Rule 8: Close with a foreign buffer id fails and deletes nothing
#[test]
fn rule_8_mismatched_buffer_is_rejected() {
    let queue = memory_queue("sync");
    for i in 0..3 {
        queue.append(&json!(i)).unwrap();
    }
    let live = queue.checkout(None).unwrap().unwrap();
    let impostor = Buffer::new("not-the-live-buffer", live.items().to_vec());

    let err = queue.close(&impostor, &live.item_ids()).unwrap_err();
    assert!(matches!(err, QueueError::BufferMismatch { .. }));
    assert_eq!(queue.size().unwrap(), 3);

    let err = queue.checkin(&impostor).unwrap_err();
    assert!(matches!(err, QueueError::BufferMismatch { .. }));
    assert_eq!(queue.checkout_token().unwrap().as_deref(), Some(live.id()));
}

/// Rule 9: Close with no checkout outstanding fails with NotCheckedOut
#[test]
fn rule_9_close_without_checkout() {
    let queue = memory_queue("sync");
    let id = queue.append(&json!(1)).unwrap();

    let err = queue.close(&Buffer::from_id("stale"), &[id]).unwrap_err();
    assert!(matches!(err, QueueError::NotCheckedOut { .. }));
    assert_eq!(queue.size().unwrap(), 1);

    let err = queue.checkin(&Buffer::from_id("stale")).unwrap_err();
    assert_eq!(err.kind(), "not_checked_out");
}

/// Rule 9: Closing twice fails the second time
#[test]
fn rule_9_double_close() {
    let queue = memory_queue("sync");
    queue.append(&json!(1)).unwrap();
    let buffer = queue.checkout(None).unwrap().unwrap();

    queue.close(&buffer, &buffer.item_ids()).unwrap();
    let err = queue.close(&buffer, &buffer.item_ids()).unwrap_err();
    assert!(matches!(err, QueueError::NotCheckedOut { .. }));
}

/// Rule 10: Close with an empty id list still releases the token
#[test]
fn rule_10_empty_close_releases_token() {
    let queue = memory_queue("sync");
    queue.append(&json!(1)).unwrap();
    let buffer = queue.checkout(None).unwrap().unwrap();

    assert_eq!(queue.close(&buffer, &[]).unwrap(), 0);
    assert_eq!(queue.size().unwrap(), 1);
    assert!(queue.checkout_token().unwrap().is_none());
}

/// Rule 10: Close deletes only the confirmed subset
#[test]
fn rule_10_partial_close() {
    let queue = memory_queue("sync");
    for i in 0..4 {
        queue.append(&json!(i)).unwrap();
    }
    let buffer = queue.checkout(None).unwrap().unwrap();
    let ids = buffer.item_ids();

    assert_eq!(queue.close(&buffer, &[ids[1].clone(), ids[3].clone()]).unwrap(), 2);
    let remaining: Vec<_> = queue.get_all().unwrap().into_iter().map(|i| i.value).collect();
    assert_eq!(remaining, vec![json!(0), json!(2)]);
}

/// Rule 11: A reconstructed buffer (id only) can close a live checkout
#[test]
fn rule_11_reconstructed_buffer_closes() {
    let queue = memory_queue("sync");
    for i in 0..2 {
        queue.append(&json!(i)).unwrap();
    }
    let buffer = queue.checkout(None).unwrap().unwrap();

    let remote = Buffer::from_id(buffer.id());
    assert_eq!(queue.close(&remote, &buffer.item_ids()).unwrap(), 2);
    assert_eq!(queue.size().unwrap(), 0);
}
