use super::*;
use std::sync::Arc;

#[test]
fn test_new_queue_is_empty() {
    let queue: DeletionQueue<u32> = DeletionQueue::new(3);
    assert_eq!(queue.frames_in_flight(), 3);
    assert_eq!(queue.total_pending(), 0);
    for frame in 0..3 {
        assert!(queue.drain(frame).is_empty());
    }
}

#[test]
fn test_items_stay_in_their_slot() {
    let queue = DeletionQueue::new(2);
    queue.push(0, "image");
    queue.push(1, "sampler");
    queue.push(0, "view");

    assert_eq!(queue.pending(0), 2);
    assert_eq!(queue.pending(1), 1);

    assert_eq!(queue.drain(1), vec!["sampler"]);
    assert_eq!(queue.pending(0), 2);
    assert_eq!(queue.drain(0), vec!["image", "view"]);
    assert_eq!(queue.total_pending(), 0);
}

#[test]
fn test_drain_is_one_shot() {
    let queue = DeletionQueue::new(2);
    queue.push(1, 7u64);
    assert_eq!(queue.drain(1), vec![7]);
    assert!(queue.drain(1).is_empty());
}

#[test]
fn test_drain_all_collects_every_slot() {
    let queue = DeletionQueue::new(3);
    queue.push(0, 1);
    queue.push(1, 2);
    queue.push(2, 3);
    let mut all = queue.drain_all();
    all.sort();
    assert_eq!(all, vec![1, 2, 3]);
    assert_eq!(queue.total_pending(), 0);
}

#[test]
fn test_drop_runs_only_on_drain() {
    struct Tracked(Arc<std::sync::atomic::AtomicUsize>);
    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    let dropped = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let queue = DeletionQueue::new(2);
    queue.push(0, Tracked(Arc::clone(&dropped)));
    queue.push(0, Tracked(Arc::clone(&dropped)));

    drop(queue.drain(1));
    assert_eq!(dropped.load(std::sync::atomic::Ordering::SeqCst), 0);

    drop(queue.drain(0));
    assert_eq!(dropped.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[test]
fn test_concurrent_push() {
    let queue = Arc::new(DeletionQueue::new(2));
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for i in 0..100 {
                    queue.push((t + i) % 2, i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(queue.total_pending(), 400);
}
