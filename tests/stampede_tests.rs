// Tests for stampede protection under real thread contention
//
// A slow data source makes concurrent requests overlap; the interceptor must
// run the query once per key and serve everyone else from the cache.

use rowcache::{BoxError, Interceptor, NamedValue, Queryer, Rows, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

const QUERY: &str = "/* @cache-ttl 60 @cache-max-rows 100 */ SELECT id FROM events WHERE kind = ?";

struct CountRows {
    remaining: i64,
}

impl Rows for CountRows {
    fn columns(&mut self) -> Vec<String> {
        vec!["id".to_string()]
    }

    fn next(&mut self, dest: &mut [Value]) -> Result<bool, BoxError> {
        if self.remaining == 0 {
            return Ok(false);
        }
        dest[0] = Value::Int(self.remaining);
        self.remaining -= 1;
        Ok(true)
    }

    fn close(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Source that takes a while to answer and counts executions.
#[derive(Default)]
struct SlowSource {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    overlapped: AtomicBool,
    fail: AtomicBool,
}

impl Queryer for SlowSource {
    fn query(&self, _query: &str, _args: &[NamedValue]) -> Result<Box<dyn Rows>, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        thread::sleep(Duration::from_millis(30 + fastrand::u64(0..20)));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err("statement timeout".into());
        }
        Ok(Box::new(CountRows { remaining: 3 }))
    }
}

fn read_all(mut rows: Box<dyn Rows>) -> Vec<Value> {
    let mut out = Vec::new();
    let mut dest = vec![Value::Null];
    while rows.next(&mut dest).unwrap() {
        out.push(dest[0].clone());
    }
    rows.close().unwrap();
    out
}

#[test]
fn test_concurrent_misses_execute_once() {
    let interceptor = rowcache::in_memory();
    let source = Arc::new(SlowSource::default());
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let interceptor = interceptor.clone();
            let source = Arc::clone(&source);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let args = [NamedValue::positional(1, "login")];
                read_all(interceptor.query(&*source, QUERY, &args).unwrap())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    for result in &results {
        assert_eq!(result, &vec![Value::Int(3), Value::Int(2), Value::Int(1)]);
    }

    let stats = interceptor.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, threads as u64 - 1);
    assert_eq!(stats.errors, 0);
    assert_eq!(interceptor.locked_keys(), 0);
}

#[test]
fn test_distinct_keys_execute_in_parallel() {
    let interceptor = rowcache::in_memory();
    let source = Arc::new(SlowSource::default());
    let threads = 4;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let interceptor = interceptor.clone();
            let source = Arc::clone(&source);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let args = [NamedValue::positional(1, format!("kind-{i}"))];
                read_all(interceptor.query(&*source, QUERY, &args).unwrap())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(source.calls.load(Ordering::SeqCst), threads);
    assert_eq!(interceptor.stats().misses, threads as u64);
    assert_eq!(interceptor.locked_keys(), 0);
}

#[test]
fn test_open_stream_does_not_block_other_keys() {
    let interceptor = rowcache::in_memory();
    let source = Arc::new(SlowSource::default());

    // Holds the write lock for "a" until it is closed
    let held = interceptor
        .query(&*source, QUERY, &[NamedValue::positional(1, "a")])
        .unwrap();

    let (tx, rx) = mpsc::channel();
    let worker = {
        let interceptor = interceptor.clone();
        let source = Arc::clone(&source);
        thread::spawn(move || {
            let args = [NamedValue::positional(1, "b")];
            let rows = read_all(interceptor.query(&*source, QUERY, &args).unwrap());
            tx.send(rows.len()).unwrap();
        })
    };

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 3);
    worker.join().unwrap();
    read_all(held);
    assert_eq!(interceptor.locked_keys(), 0);
}

#[test]
fn test_waiters_proceed_after_failed_execution() {
    let interceptor: Interceptor = rowcache::in_memory();
    let source = Arc::new(SlowSource::default());
    source.fail.store(true, Ordering::SeqCst);
    let threads = 4;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let interceptor = interceptor.clone();
            let source = Arc::clone(&source);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                interceptor
                    .query(&*source, QUERY, &[])
                    .map(|rows| read_all(rows).len())
                    .map_err(|err| err.to_string())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Err("statement timeout".to_string()));
    }

    // Every caller had its turn, one at a time, and nothing was cached
    assert_eq!(source.calls.load(Ordering::SeqCst), threads);
    assert!(!source.overlapped.load(Ordering::SeqCst));
    assert_eq!(interceptor.stats().hits, 0);
    assert_eq!(interceptor.locked_keys(), 0);

    source.fail.store(false, Ordering::SeqCst);
    assert_eq!(read_all(interceptor.query(&*source, QUERY, &[]).unwrap()).len(), 3);
}
