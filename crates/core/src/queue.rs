//! In-process serialization of read-modify-write cycles.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// FIFO queue of mutations against one persisted document.
///
/// Callers `enter()` before reading the document and hold the returned turn
/// until the new version is on disk. Waiters are admitted strictly in arrival
/// order (tokio's mutex is fair), so no two cycles interleave and none starves.
#[derive(Clone, Default)]
pub struct MutationQueue {
    turn: Arc<Mutex<()>>,
}

/// Exclusive right to mutate, released on drop.
pub struct QueueTurn<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for this caller's turn.
    pub async fn enter(&self) -> QueueTurn<'_> {
        QueueTurn {
            _guard: self.turn.lock().await,
        }
    }

    /// Run `f` while holding a turn.
    pub async fn run<T>(&self, f: impl FnOnce() -> T) -> T {
        let _turn = self.enter().await;
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_turns_do_not_interleave() {
        let queue = MutationQueue::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = queue.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _turn = queue.enter().await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_waiters_are_admitted_in_order() {
        let queue = MutationQueue::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let first = queue.enter().await;
        let mut handles = Vec::new();
        for i in 0..5 {
            let queue = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                queue.run(|| order.lock().unwrap().push(i)).await;
            }));
            // let each task register as a waiter before spawning the next
            tokio::task::yield_now().await;
        }
        drop(first);
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}
