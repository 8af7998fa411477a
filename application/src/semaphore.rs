//! Agent concurrency semaphore
//!
//! A FIFO counting semaphore gating every specialist spawn. Permits are
//! RAII guards, so a slot is released on every exit path: normal
//! completion, timeout, panic unwinding, or future cancellation.
//! Capacity is adjustable at runtime: reducing it never interrupts
//! in-flight holders, it only blocks new acquisitions until
//! `active <= capacity` again.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

struct SemInner {
    capacity: usize,
    active: usize,
    waiters: VecDeque<oneshot::Sender<AgentPermit>>,
}

/// Counting semaphore with dynamic capacity and live telemetry.
#[derive(Clone)]
pub struct AgentSemaphore {
    inner: Arc<Mutex<SemInner>>,
}

/// One unit of admission control, held for the duration of a worker run.
pub struct AgentPermit {
    inner: Arc<Mutex<SemInner>>,
    released: bool,
}

impl AgentSemaphore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SemInner {
                capacity: capacity.max(1),
                active: 0,
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Acquire a slot, blocking (FIFO) while `active >= capacity`.
    pub async fn acquire(&self) -> AgentPermit {
        loop {
            let receiver = {
                let mut inner = self.inner.lock().expect("semaphore lock poisoned");
                if inner.active < inner.capacity {
                    inner.active += 1;
                    return AgentPermit {
                        inner: Arc::clone(&self.inner),
                        released: false,
                    };
                }
                let (tx, rx) = oneshot::channel();
                inner.waiters.push_back(tx);
                rx
            };

            // The slot transfers through the channel; an abandoned waiter
            // is skipped by the releaser. A dropped sender means the
            // handoff raced with our cancellation bookkeeping; retry.
            if let Ok(permit) = receiver.await {
                return permit;
            }
        }
    }

    /// Set the ceiling to `max(1, capacity)`. Raising it wakes queued
    /// waiters; lowering it never preempts holders.
    pub fn adjust_capacity(&self, capacity: usize) {
        let mut to_wake = Vec::new();
        {
            let mut inner = self.inner.lock().expect("semaphore lock poisoned");
            inner.capacity = capacity.max(1);
            while inner.active < inner.capacity {
                match inner.waiters.pop_front() {
                    Some(waiter) => {
                        inner.active += 1;
                        to_wake.push(waiter);
                    }
                    None => break,
                }
            }
        }
        for waiter in to_wake {
            let permit = AgentPermit {
                inner: Arc::clone(&self.inner),
                released: false,
            };
            if let Err(mut unclaimed) = waiter.send(permit) {
                // Waiter abandoned between queueing and wake-up
                unclaimed.released = true;
                Self::release_slot(&self.inner);
            }
        }
    }

    /// Currently held slots.
    pub fn active(&self) -> usize {
        self.inner.lock().expect("semaphore lock poisoned").active
    }

    /// Slots free at this instant (best-effort snapshot).
    pub fn available(&self) -> usize {
        let inner = self.inner.lock().expect("semaphore lock poisoned");
        inner.capacity.saturating_sub(inner.active)
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().expect("semaphore lock poisoned").capacity
    }

    /// Number of queued waiters.
    pub fn waiting(&self) -> usize {
        self.inner
            .lock()
            .expect("semaphore lock poisoned")
            .waiters
            .len()
    }

    fn release_slot(inner: &Arc<Mutex<SemInner>>) {
        loop {
            let waiter = {
                let mut guard = inner.lock().expect("semaphore lock poisoned");
                if guard.active <= guard.capacity {
                    match guard.waiters.pop_front() {
                        Some(waiter) => Some(waiter),
                        None => {
                            guard.active -= 1;
                            None
                        }
                    }
                } else {
                    // Capacity was reduced below the holder count: shrink
                    // instead of handing the slot on.
                    guard.active -= 1;
                    None
                }
            };

            let Some(waiter) = waiter else { return };

            let permit = AgentPermit {
                inner: Arc::clone(inner),
                released: false,
            };
            match waiter.send(permit) {
                Ok(()) => return,
                Err(mut unclaimed) => {
                    // Waiter gone; neutralize the permit and try the next
                    unclaimed.released = true;
                    continue;
                }
            }
        }
    }
}

impl Drop for AgentPermit {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            AgentSemaphore::release_slot(&self.inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn test_acquire_within_capacity() {
        let sem = AgentSemaphore::new(2);
        let p1 = sem.acquire().await;
        let p2 = sem.acquire().await;
        assert_eq!(sem.active(), 2);
        assert_eq!(sem.available(), 0);
        drop(p1);
        assert_eq!(sem.active(), 1);
        drop(p2);
        assert_eq!(sem.active(), 0);
    }

    #[tokio::test]
    async fn test_acquire_blocks_at_capacity() {
        let sem = AgentSemaphore::new(1);
        let permit = sem.acquire().await;

        let sem2 = sem.clone();
        let waiter = tokio::spawn(async move { sem2.acquire().await });
        sleep(Duration::from_millis(20)).await;
        assert_eq!(sem.waiting(), 1);

        drop(permit);
        let p2 = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap();
        assert_eq!(sem.active(), 1);
        drop(p2);
        assert_eq!(sem.active(), 0);
    }

    #[tokio::test]
    async fn test_fifo_order_among_waiters() {
        let sem = AgentSemaphore::new(1);
        let permit = sem.acquire().await;

        let (order_tx, mut order_rx) = tokio::sync::mpsc::unbounded_channel();
        for i in 0..3 {
            let sem = sem.clone();
            let order_tx = order_tx.clone();
            tokio::spawn(async move {
                let p = sem.acquire().await;
                order_tx.send(i).unwrap();
                drop(p);
            });
            // Give each task time to enqueue so the queue order is fixed
            sleep(Duration::from_millis(20)).await;
        }

        drop(permit);
        let mut order = Vec::new();
        for _ in 0..3 {
            order.push(
                timeout(Duration::from_secs(1), order_rx.recv())
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_capacity_increase_wakes_waiters() {
        let sem = AgentSemaphore::new(1);
        let _p1 = sem.acquire().await;

        let sem2 = sem.clone();
        let waiter = tokio::spawn(async move { sem2.acquire().await });
        sleep(Duration::from_millis(20)).await;

        sem.adjust_capacity(2);
        let _p2 = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("capacity increase should wake the waiter")
            .unwrap();
        assert_eq!(sem.active(), 2);
    }

    #[tokio::test]
    async fn test_capacity_reduction_does_not_preempt() {
        let sem = AgentSemaphore::new(3);
        let p1 = sem.acquire().await;
        let p2 = sem.acquire().await;
        let _p3 = sem.acquire().await;

        sem.adjust_capacity(1);
        assert_eq!(sem.active(), 3, "holders are not preempted");
        assert_eq!(sem.capacity(), 1);

        // Releases shrink toward the new ceiling before any handoff
        drop(p1);
        assert_eq!(sem.active(), 2);
        drop(p2);
        assert_eq!(sem.active(), 1);
    }

    #[tokio::test]
    async fn test_capacity_floor_is_one() {
        let sem = AgentSemaphore::new(5);
        sem.adjust_capacity(0);
        assert_eq!(sem.capacity(), 1);
        let _p = sem.acquire().await;
        assert_eq!(sem.active(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_waiter_is_skipped() {
        let sem = AgentSemaphore::new(1);
        let permit = sem.acquire().await;

        // First waiter gives up before being woken
        let sem2 = sem.clone();
        let abandoned = tokio::spawn(async move {
            let _ = timeout(Duration::from_millis(30), sem2.acquire()).await;
        });
        sleep(Duration::from_millis(10)).await;

        // Second waiter stays
        let sem3 = sem.clone();
        let patient = tokio::spawn(async move { sem3.acquire().await });
        sleep(Duration::from_millis(40)).await;
        abandoned.await.unwrap();

        drop(permit);
        let p = timeout(Duration::from_secs(1), patient)
            .await
            .expect("slot should skip the abandoned waiter")
            .unwrap();
        assert_eq!(sem.active(), 1);
        drop(p);
        assert_eq!(sem.active(), 0);
    }

    #[tokio::test]
    async fn test_no_leak_under_randomized_churn() {
        let sem = AgentSemaphore::new(3);
        let mut handles = Vec::new();

        for i in 0..60u64 {
            let sem = sem.clone();
            handles.push(tokio::spawn(async move {
                // Some tasks give up while queued, some hold briefly, some
                // panic while holding; every path must release.
                let wait = Duration::from_millis(5 + (i * 7) % 40);
                match timeout(wait, sem.acquire()).await {
                    Ok(permit) => {
                        assert!(sem.active() <= 3);
                        sleep(Duration::from_millis((i * 3) % 10)).await;
                        if i % 13 == 0 {
                            drop(permit);
                            panic!("injected fault");
                        }
                        drop(permit);
                    }
                    Err(_) => {}
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
        assert_eq!(sem.active(), 0, "all slots must return");
        assert_eq!(sem.waiting(), 0);
    }

    #[tokio::test]
    async fn test_active_never_exceeds_capacity() {
        let sem = AgentSemaphore::new(2);
        let mut handles = Vec::new();
        for _ in 0..20 {
            let sem = sem.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await;
                assert!(sem.active() <= 2);
                sleep(Duration::from_millis(5)).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(sem.active(), 0);
    }
}
