/*!
 * Bounded Channel Integration Tests
 *
 * FIFO ordering, single delivery across racing consumers, backpressure,
 * and cancellation liveness of blocked operations
 */

use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};
use synckit::{BoundedChannel, CancellationToken, SyncError};

#[test]
fn test_fifo_single_producer() {
    let channel = BoundedChannel::new(16);
    let token = CancellationToken::new();

    for i in 0..16 {
        channel.put(i, &token).unwrap();
    }
    let taken: Vec<u32> = (0..16).map(|_| channel.take(&token).unwrap()).collect();
    assert_eq!(taken, (0..16).collect::<Vec<_>>());
}

#[test]
fn test_backpressure_blocks_producer() {
    let channel = BoundedChannel::new(2);
    let token = CancellationToken::new();
    channel.put(1u32, &token).unwrap();
    channel.put(2, &token).unwrap();

    let channel_clone = channel.clone();
    let token_clone = token.clone();
    let producer = thread::spawn(move || {
        let start = Instant::now();
        channel_clone.put(3, &token_clone).unwrap();
        start.elapsed()
    });

    // Producer must be parked until a slot frees up
    thread::sleep(Duration::from_millis(100));
    assert_eq!(channel.take(&token).unwrap(), 1);

    let blocked_for = producer.join().unwrap();
    assert!(blocked_for >= Duration::from_millis(80));
    assert_eq!(channel.len(), 2);
}

#[test]
fn test_cancellation_liveness_blocked_put() {
    // Zero free capacity, blocked put, cancel() must release it promptly
    let channel = BoundedChannel::new(1);
    let token = CancellationToken::new();
    channel.put(0u32, &token).unwrap();

    let channel_clone = channel.clone();
    let token_clone = token.clone();
    let blocked = thread::spawn(move || {
        let start = Instant::now();
        let result = channel_clone.put(1, &token_clone);
        (result, start.elapsed())
    });

    thread::sleep(Duration::from_millis(50));
    token.cancel();

    let (result, elapsed) = blocked.join().unwrap();
    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.into_inner(), 1);
    assert!(
        elapsed < Duration::from_secs(2),
        "blocked put not released within bounded time: {:?}",
        elapsed
    );
}

#[test]
fn test_cancellation_liveness_blocked_take() {
    let channel = BoundedChannel::<u32>::new(4);
    let token = CancellationToken::new();

    let channel_clone = channel.clone();
    let token_clone = token.clone();
    let blocked = thread::spawn(move || channel_clone.take(&token_clone));

    thread::sleep(Duration::from_millis(50));
    token.cancel();

    assert_eq!(blocked.join().unwrap(), Err(SyncError::Cancelled));
}

#[test]
fn test_no_double_delivery() {
    // 4 producers x 250 items, 4 consumers; every item taken exactly once
    let channel = BoundedChannel::new(8);
    let token = CancellationToken::new();
    let per_producer = 250u32;
    let producers = 4u32;
    let total = (per_producer * producers) as usize;

    let producer_handles: Vec<_> = (0..producers)
        .map(|p| {
            let channel = channel.clone();
            let token = token.clone();
            thread::spawn(move || {
                for i in 0..per_producer {
                    channel.put(p * per_producer + i, &token).unwrap();
                }
            })
        })
        .collect();

    let consumer_handles: Vec<_> = (0..4)
        .map(|_| {
            let channel = channel.clone();
            let token = token.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Ok(item) = channel.take_timeout(Duration::from_millis(500), &token) {
                    seen.push(item);
                }
                seen
            })
        })
        .collect();

    for handle in producer_handles {
        handle.join().unwrap();
    }

    let mut all: Vec<u32> = Vec::with_capacity(total);
    for handle in consumer_handles {
        all.extend(handle.join().unwrap());
    }

    assert_eq!(all.len(), total, "lost or duplicated deliveries");
    let unique: HashSet<u32> = all.iter().copied().collect();
    assert_eq!(unique.len(), total);
    assert!(channel.is_empty());
}

#[test]
fn test_per_producer_order_preserved() {
    // Interleaving across producers is unspecified, but each producer's own
    // items must come out in its submission order
    let channel = BoundedChannel::new(4);
    let token = CancellationToken::new();

    let handles: Vec<_> = (0..2u32)
        .map(|p| {
            let channel = channel.clone();
            let token = token.clone();
            thread::spawn(move || {
                for i in 0..100u32 {
                    channel.put((p, i), &token).unwrap();
                }
            })
        })
        .collect();

    let mut last_seen = [None::<u32>, None::<u32>];
    for _ in 0..200 {
        let (p, i) = channel
            .take_timeout(Duration::from_secs(2), &token)
            .unwrap();
        if let Some(prev) = last_seen[p as usize] {
            assert!(i > prev, "producer {} reordered: {} after {}", p, i, prev);
        }
        last_seen[p as usize] = Some(i);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_occupancy_never_exceeds_capacity() {
    let capacity = 3;
    let channel = BoundedChannel::new(capacity);
    let token = CancellationToken::new();
    let stop = CancellationToken::new();

    let producer = {
        let channel = channel.clone();
        let token = token.clone();
        thread::spawn(move || {
            for i in 0..500u32 {
                channel.put(i, &token).unwrap();
            }
        })
    };

    let watcher = {
        let channel = channel.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut max_seen = 0;
            while !stop.is_cancelled() {
                max_seen = max_seen.max(channel.len());
            }
            max_seen
        })
    };

    for _ in 0..500 {
        channel.take(&token).unwrap();
    }
    producer.join().unwrap();
    stop.cancel();

    let max_seen = watcher.join().unwrap();
    assert!(max_seen <= capacity, "occupancy {} > capacity", max_seen);
}
