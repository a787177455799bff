use crossbeam_channel::{bounded, Receiver, Sender};
use once_cell::sync::OnceCell;
use std::sync::Arc;

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

type Waker = Box<dyn Fn() + Send + Sync>;

/// Consumer end of the hand-off to the UI thread.
///
/// Workers hold a [`DispatchHandle`] and post actions; the UI loop calls
/// [`Dispatcher::drain`] each frame and runs them in arrival order. Dropping
/// the dispatcher makes every later `request_action` a silent no-op.
pub struct Dispatcher<A> {
    tx: Sender<A>,
    rx: Receiver<A>,
    waker: Arc<OnceCell<Waker>>,
}

/// Producer end. Cheap to clone, one per thread or task.
pub struct DispatchHandle<A> {
    tx: Sender<A>,
    waker: Arc<OnceCell<Waker>>,
}

impl<A> Clone for DispatchHandle<A> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone(), waker: Arc::clone(&self.waker) }
    }
}

impl<A> Default for Dispatcher<A> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl<A> Dispatcher<A> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self { tx, rx, waker: Arc::new(OnceCell::new()) }
    }

    pub fn handle(&self) -> DispatchHandle<A> {
        DispatchHandle { tx: self.tx.clone(), waker: Arc::clone(&self.waker) }
    }

    /// Called after every successful enqueue, e.g. to wake an idle event loop.
    /// Only the first waker set is kept.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        let _ = self.waker.set(Box::new(waker));
    }

    /// Runs `f` on every queued action without blocking. Returns how many ran.
    pub fn drain(&self, mut f: impl FnMut(A)) -> usize {
        let mut n = 0;
        while let Ok(action) = self.rx.try_recv() {
            f(action);
            n += 1;
        }
        n
    }

    #[cfg(test)]
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<A> {
        self.rx.recv_timeout(timeout).ok()
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl<A> DispatchHandle<A> {
    /// Queues `action` for the UI thread. Blocks while the queue is full.
    /// Returns `false` (and drops the action) once the UI side is gone.
    pub fn request_action(&self, action: A) -> bool {
        match self.tx.send(action) {
            Ok(()) => {
                if let Some(wake) = self.waker.get() {
                    wake();
                }
                true
            }
            Err(_) => {
                tracing::debug!("dispatcher closed; dropping action");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn concurrent_producers_keep_per_producer_order() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 200;

        // Smaller than the total so producers really block on a full queue.
        let dispatcher = Dispatcher::<(usize, usize)>::new(16);
        let workers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let h = dispatcher.handle();
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        assert!(h.request_action((p, seq)));
                    }
                })
            })
            .collect();

        let mut seen: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut total = 0;
        while total < PRODUCERS * PER_PRODUCER {
            if let Some((p, seq)) = dispatcher.recv_timeout(Duration::from_secs(5)) {
                seen.entry(p).or_default().push(seq);
                total += 1;
            } else {
                panic!("timed out after {} actions", total);
            }
        }
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(dispatcher.pending(), 0);
        for p in 0..PRODUCERS {
            let expected: Vec<usize> = (0..PER_PRODUCER).collect();
            assert_eq!(seen[&p], expected, "producer {} out of order", p);
        }
    }

    #[test]
    fn drain_runs_each_action_once_in_fifo_order() {
        let dispatcher = Dispatcher::new(8);
        let h = dispatcher.handle();
        for i in 0..5 {
            h.request_action(i);
        }
        let mut got = Vec::new();
        assert_eq!(dispatcher.drain(|a| got.push(a)), 5);
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
        assert_eq!(dispatcher.drain(|a| got.push(a)), 0);
    }

    #[test]
    fn request_after_consumer_dropped_is_silently_discarded() {
        let dispatcher = Dispatcher::<String>::new(4);
        let h = dispatcher.handle();
        drop(dispatcher);
        assert!(!h.request_action("late result".to_string()));
    }

    #[test]
    fn waker_fires_per_enqueued_action() {
        let dispatcher = Dispatcher::new(4);
        let wakes = Arc::new(AtomicUsize::new(0));
        let w = Arc::clone(&wakes);
        dispatcher.set_waker(move || {
            w.fetch_add(1, Ordering::SeqCst);
        });
        let h = dispatcher.handle();
        h.request_action(1);
        h.request_action(2);
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }
}
