//! Unit lifecycle tests: open, exclusivity, close, abort and reset.

use std::sync::Arc;
use std::time::Duration;

use gpiodev_core::{
    RequestRecord, Status, Ticket, CMD_READ, CMD_WAIT, REQUEST_LEN_MIN,
};
use gpiodev_dispatch::{DeviceError, DispatcherConfig, UnitTable};
use gpiodev_mock::{MockBackend, MockCaller};

const TIMEOUT: Duration = Duration::from_secs(2);

fn make_table() -> (Arc<MockBackend>, UnitTable) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let backend = Arc::new(MockBackend::new());
    let table =
        UnitTable::new(backend.clone(), DispatcherConfig::default()).expect("valid config");
    (backend, table)
}

#[test]
fn test_open_close_releases_slot() {
    let (_backend, table) = make_table();

    let handle = table.open(0, false, REQUEST_LEN_MIN).expect("open");
    assert_eq!(table.open_count(), 1);
    let unit = table.lookup(handle).expect("unit");
    assert!(unit.worker_running());

    table.close(handle);
    assert_eq!(table.open_count(), 0);
    assert!(table.lookup(handle).is_none());
}

#[test]
fn test_open_rejects_short_request() {
    let (_backend, table) = make_table();
    match table.open(0, false, REQUEST_LEN_MIN - 1) {
        Err(DeviceError::BadLength { len, min }) => {
            assert_eq!(len, REQUEST_LEN_MIN - 1);
            assert_eq!(min, REQUEST_LEN_MIN);
        }
        other => panic!("expected BadLength, got {:?}", other.map(|h| h.0)),
    }
    assert_eq!(table.open_count(), 0);
}

#[test]
fn test_capacity_exhaustion_leaves_table_untouched() {
    let (_backend, table) = make_table();
    let handles: Vec<_> = (0..table.capacity())
        .map(|u| table.open(u as u32, false, REQUEST_LEN_MIN).expect("open"))
        .collect();
    assert_eq!(table.open_count(), table.capacity());

    // One more must fail without disturbing the open units.
    assert!(matches!(
        table.open(99, false, REQUEST_LEN_MIN),
        Err(DeviceError::OpenFailed { .. })
    ));
    assert_eq!(table.open_count(), table.capacity());
    for handle in &handles {
        assert!(table.lookup(*handle).is_some());
    }

    table.reset();
    assert_eq!(table.open_count(), 0);
}

#[test]
fn test_exclusive_open_blocks_second_open() {
    let (_backend, table) = make_table();
    let first = table.open(3, true, REQUEST_LEN_MIN).expect("open");

    assert!(matches!(
        table.open(3, false, REQUEST_LEN_MIN),
        Err(DeviceError::UnitBusy { unit: 3 })
    ));
    assert!(matches!(
        table.open(3, true, REQUEST_LEN_MIN),
        Err(DeviceError::UnitBusy { unit: 3 })
    ));
    // The holder is untouched.
    assert!(table.lookup(first).is_some());
    assert_eq!(table.open_count(), 1);

    // A different physical unit is unaffected.
    table.open(4, false, REQUEST_LEN_MIN).expect("open");

    table.reset();
}

#[test]
fn test_shared_opens_coexist() {
    let (_backend, table) = make_table();
    let a = table.open(0, false, REQUEST_LEN_MIN).expect("open");
    let b = table.open(0, false, REQUEST_LEN_MIN).expect("open");
    assert_ne!(a, b);
    assert_eq!(table.open_count(), 2);

    // Only an exclusive holder blocks others; an exclusive open of a
    // shared-held unit succeeds.
    table.open(0, true, REQUEST_LEN_MIN).expect("open");
    assert_eq!(table.open_count(), 3);

    table.reset();
}

#[test]
fn test_handles_never_reused() {
    let (_backend, table) = make_table();
    let first = table.open(0, false, REQUEST_LEN_MIN).expect("open");
    table.close(first);
    let second = table.open(0, false, REQUEST_LEN_MIN).expect("open");
    assert_ne!(first, second);

    // The stale handle cannot alias the new unit.
    assert!(table.lookup(first).is_none());
    assert!(table.lookup(second).is_some());

    table.reset();
}

#[test]
fn test_begin_io_on_stale_handle_completes_open_failed() {
    let (_backend, table) = make_table();
    let handle = table.open(0, false, REQUEST_LEN_MIN).expect("open");
    table.close(handle);

    let ctx = Arc::new(MockCaller::with_payload(&[0, 0]));
    let record = RequestRecord::new(handle, CMD_READ, Ticket(1)).with_quick();
    table.begin_io(record, ctx.clone()).expect("begin_io");

    let completions = ctx.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].status, Status::OpenFailed);
}

#[test]
fn test_abort_completes_exactly_once() {
    let (_backend, table) = make_table();
    let handle = table.open(0, false, REQUEST_LEN_MIN).expect("open");

    let ctx = Arc::new(MockCaller::with_payload(&[2, 0]));
    let record = RequestRecord::new(handle, CMD_WAIT, Ticket(42));
    table.begin_io(record, ctx.clone()).expect("begin_io");

    let unit = table.lookup(handle).expect("unit");
    // Let the worker park the request before cancelling.
    let deadline = std::time::Instant::now() + TIMEOUT;
    while unit.pending_len() == 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(unit.pending_len(), 1);

    table.abort(handle, Ticket(42)).expect("abort");
    assert!(ctx.wait_for_completions(1, TIMEOUT));
    assert_eq!(ctx.completions()[0].status, Status::Aborted);
    assert_eq!(unit.pending_len(), 0);

    // A second abort of the same ticket finds nothing and must not
    // produce a second completion.
    table.abort(handle, Ticket(42)).expect("abort");
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(ctx.completion_count(), 1);

    table.reset();
}

#[test]
fn test_abort_unknown_ticket_is_harmless() {
    let (_backend, table) = make_table();
    let handle = table.open(0, false, REQUEST_LEN_MIN).expect("open");

    table.abort(handle, Ticket(999)).expect("abort");

    table.close(handle);
    assert!(matches!(
        table.abort(handle, Ticket(999)),
        Err(DeviceError::StaleHandle(_))
    ));
}

#[test]
fn test_reset_drains_pending_and_stops_workers() {
    let (_backend, table) = make_table();
    let handle = table.open(0, false, REQUEST_LEN_MIN).expect("open");

    let ctx_a = Arc::new(MockCaller::with_payload(&[1, 0]));
    table
        .begin_io(RequestRecord::new(handle, CMD_WAIT, Ticket(1)), ctx_a.clone())
        .expect("begin_io");
    let ctx_b = Arc::new(MockCaller::with_payload(&[2, 1]));
    table
        .begin_io(RequestRecord::new(handle, CMD_WAIT, Ticket(2)), ctx_b.clone())
        .expect("begin_io");

    let unit = table.lookup(handle).expect("unit");
    let deadline = std::time::Instant::now() + TIMEOUT;
    while unit.pending_len() < 2 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(unit.pending_len(), 2);

    table.reset();

    assert!(ctx_a.wait_for_completions(1, TIMEOUT));
    assert!(ctx_b.wait_for_completions(1, TIMEOUT));
    assert_eq!(ctx_a.completions()[0].status, Status::Aborted);
    assert_eq!(ctx_b.completions()[0].status, Status::Aborted);

    // Reset joins the worker; the Arc we kept observes the teardown.
    assert!(!unit.worker_running());
    assert_eq!(unit.pending_len(), 0);
    assert_eq!(table.open_count(), 0);
}

#[test]
fn test_close_does_not_join_worker() {
    let (_backend, table) = make_table();
    let handle = table.open(0, false, REQUEST_LEN_MIN).expect("open");
    let unit = table.lookup(handle).expect("unit");

    // Close returns promptly; the worker drains and exits on its own.
    table.close(handle);
    assert!(!unit.is_open());

    let deadline = std::time::Instant::now() + TIMEOUT;
    while unit.worker_running() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(!unit.worker_running());
}

#[test]
fn test_backend_open_failure_restores_slot() {
    let (backend, table) = make_table();
    backend.set_fail_open(true);

    assert!(matches!(
        table.open(0, false, REQUEST_LEN_MIN),
        Err(DeviceError::OpenFailed { .. })
    ));
    assert_eq!(table.open_count(), 0);

    // The slot is free again once the backend recovers.
    backend.set_fail_open(false);
    table.open(0, false, REQUEST_LEN_MIN).expect("open");
    assert_eq!(table.open_count(), 1);

    table.reset();
}

#[test]
fn test_shutdown_is_idempotent() {
    let (_backend, table) = make_table();
    table.open(0, false, REQUEST_LEN_MIN).expect("open");
    table.shutdown();
    assert_eq!(table.open_count(), 0);
    table.shutdown();
    assert_eq!(table.open_count(), 0);
}
