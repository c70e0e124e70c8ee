//! Behavioural tests for the sync queue.
//!
//! - `harness.rs`     - Shared fixtures: stores, controllable clock
//! - `ordering.rs`    - Rules 1-4 (Append order & size accounting)
//! - `checkout.rs`    - Rules 5-11 (Checkout, checkin, close)
//! - `batch.rs`       - Rules 12-14 (Bulk append)
//! - `lock.rs`        - Rules 15-19 (Whole-queue lock)
//! - `concurrency.rs` - Rules 20-23 (Several handles on one SQLite file)

mod checkout;

use harness::memory_queue;
use serde_json::json;

/// Basic workflow: append, checkout, close.
#[test]
fn basic_workflow() {
    let queue = memory_queue("sync");

    for i in 0..15 {
        queue.append(&json!(["save_post", [i]])).unwrap();
    }

    let buffer = queue.checkout(None).unwrap().expect("items available");
    assert_eq!(buffer.len(), 10);
    assert_eq!(buffer.items()[0].value, json!(["save_post", [0]]));
    assert_eq!(buffer.items()[9].value, json!(["save_post", [9]]));

    let closed = queue.close(&buffer, &buffer.item_ids()).unwrap();
    assert_eq!(closed, 10);
    assert_eq!(queue.size().unwrap(), 5);
}
