// Bilateral payment-channel node core.
// Written in 2024 by
//     Dr. Maxim Orlovsky <orlovsky@pandoracore.com>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the MIT License
// along with this software.
// If not, see <https://opensource.org/licenses/MIT>.

//! The partitioned worker pool (§5): each peer identity hashes to exactly
//! one worker thread, so tasks for one channel are linearizable while
//! channels to different peers run in parallel. No global lock anywhere —
//! just a bounded queue per bucket.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender};

use crate::peer::PeerIdentity;

/// A unit of work bound to one peer: a boxed closure the worker thread
/// invokes in arrival order. The boxed form lets local commands and inbound
/// peer calls share a queue without a shared enum of every possible task
/// shape.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

struct Bucket {
    sender: Sender<Task>,
    _handle: JoinHandle<()>,
}

/// Hash-partitioned pool of worker threads. §5: "the core uses a
/// partitioned worker pool where each peer identity hashes to exactly one
/// worker thread."
pub struct WorkerPool {
    buckets: Vec<Bucket>,
}

impl WorkerPool {
    /// Spawns `width` worker threads, each draining its own bounded queue.
    pub fn new(width: usize, queue_depth: usize) -> WorkerPool {
        assert!(width > 0, "worker pool needs at least one thread");
        let buckets = (0..width)
            .map(|index| {
                let (sender, receiver) = bounded::<Task>(queue_depth);
                let handle = std::thread::Builder::new()
                    .name(format!("paychan-worker-{}", index))
                    .spawn(move || {
                        for task in receiver {
                            task();
                        }
                    })
                    .expect("failed to spawn worker thread");
                Bucket { sender, _handle: handle }
            })
            .collect();
        WorkerPool { buckets }
    }

    fn bucket_for(&self, peer: &PeerIdentity) -> &Bucket {
        let mut hasher = DefaultHasher::new();
        peer.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.buckets.len();
        &self.buckets[index]
    }

    /// Enqueues `task` on the worker owning `peer`'s channel. Tasks for the
    /// same peer are processed strictly in submission order; tasks for
    /// different peers may run concurrently.
    pub fn submit(&self, peer: &PeerIdentity, task: Task) {
        let bucket = self.bucket_for(peer);
        if bucket.sender.send(task).is_err() {
            error!("worker thread for {} has died; dropping task", peer);
        }
    }
}

/// Convenience for submitting a task and blocking the caller until it
/// completes, mirroring §5's "a local command blocks its caller via a
/// completion notification."
pub fn submit_and_wait<T: Send + 'static>(
    pool: &WorkerPool,
    peer: &PeerIdentity,
    f: impl FnOnce() -> T + Send + 'static,
) -> T {
    let (tx, rx) = crossbeam_channel::bounded(1);
    pool.submit(
        peer,
        Box::new(move || {
            let result = f();
            let _ = tx.send(result);
        }),
    );
    rx.recv().expect("worker dropped the completion channel without responding")
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn same_peer_tasks_run_in_submission_order() {
        let pool = WorkerPool::new(4, 16);
        let peer = PeerIdentity::new("http://bob");
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        for _ in 0..20 {
            let counter = counter.clone();
            let seen = seen.clone();
            pool.submit(
                &peer,
                Box::new(move || {
                    let value = counter.fetch_add(1, Ordering::SeqCst);
                    seen.lock().unwrap().push(value);
                }),
            );
        }

        let observed = submit_and_wait(&pool, &peer, move || seen.lock().unwrap().clone());
        assert_eq!(observed, (0..20).collect::<Vec<_>>());
    }
}
