//! Named one-shot and periodic timers
//!
//! Each armed timer runs as its own tokio task and reports firings over a
//! channel to whoever owns the scheduler. Re-arming a name replaces the
//! previous instance; firings that were already queued for a replaced or
//! cancelled instance are recognised as stale by their generation.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

/// A timer firing delivered to the scheduler's owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired<K> {
    pub name: K,
    pub generation: u64,
}

/// Receiving side of a scheduler's firings
pub type TimerEvents<K> = mpsc::UnboundedReceiver<TimerFired<K>>;

struct ArmedTimer {
    generation: u64,
    periodic: bool,
    task: JoinHandle<()>,
}

/// Owner of every pending timer, keyed by name
///
/// Must be used from within a tokio runtime.
pub struct TimerScheduler<K> {
    tx: mpsc::UnboundedSender<TimerFired<K>>,
    armed: HashMap<K, ArmedTimer>,
    next_generation: u64,
}

impl<K> TimerScheduler<K>
where
    K: Copy + Eq + Hash + Debug + Send + 'static,
{
    pub fn new() -> (Self, TimerEvents<K>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            armed: HashMap::new(),
            next_generation: 1,
        };
        (scheduler, rx)
    }

    /// Fire once after `delay`
    pub fn arm_once(&mut self, name: K, delay: Duration) {
        let generation = self.bump();
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(TimerFired { name, generation });
        });
        self.install(name, generation, false, task);
    }

    /// Fire every `period`, first firing one period from now
    pub fn arm_periodic(&mut self, name: K, period: Duration) {
        let generation = self.bump();
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(TimerFired { name, generation }).is_err() {
                    break;
                }
            }
        });
        self.install(name, generation, true, task);
    }

    /// Cancel a timer by name. Returns whether it was armed.
    pub fn cancel(&mut self, name: K) -> bool {
        match self.armed.remove(&name) {
            Some(timer) => {
                timer.task.abort();
                trace!(timer = ?name, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.armed.drain() {
            timer.task.abort();
        }
    }

    pub fn is_armed(&self, name: K) -> bool {
        self.armed.contains_key(&name)
    }

    /// Names of every currently armed timer
    pub fn armed(&self) -> Vec<K> {
        self.armed.keys().copied().collect()
    }

    /// Check a firing against the live instance of its timer.
    ///
    /// Returns false for stale firings. An accepted one-shot firing
    /// disarms its timer.
    pub fn accept(&mut self, fired: TimerFired<K>) -> bool {
        let Some(timer) = self.armed.get(&fired.name) else {
            return false;
        };
        if timer.generation != fired.generation {
            return false;
        }
        if !timer.periodic {
            self.armed.remove(&fired.name);
        }
        true
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    fn install(&mut self, name: K, generation: u64, periodic: bool, task: JoinHandle<()>) {
        let previous = self.armed.insert(
            name,
            ArmedTimer {
                generation,
                periodic,
                task,
            },
        );
        if let Some(previous) = previous {
            previous.task.abort();
        }
        trace!(timer = ?name, generation, periodic, "Timer armed");
    }
}

impl<K> Drop for TimerScheduler<K> {
    fn drop(&mut self) {
        for (_, timer) in self.armed.drain() {
            timer.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Name {
        A,
        B,
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_fires_once_and_disarms() {
        let (mut timers, mut rx) = TimerScheduler::new();
        timers.arm_once(Name::A, Duration::from_secs(5));
        assert!(timers.is_armed(Name::A));

        let started = Instant::now();
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.name, Name::A);
        assert_eq!(started.elapsed(), Duration::from_secs(5));

        assert!(timers.accept(fired));
        assert!(!timers.is_armed(Name::A));
        // A second delivery of the same firing is stale
        assert!(!timers.accept(fired));
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_keeps_firing_until_cancelled() {
        let (mut timers, mut rx) = TimerScheduler::new();
        timers.arm_periodic(Name::A, Duration::from_secs(1));

        for _ in 0..3 {
            let fired = rx.recv().await.unwrap();
            assert!(timers.accept(fired));
        }
        assert!(timers.is_armed(Name::A));

        assert!(timers.cancel(Name::A));
        assert!(!timers.cancel(Name::A));

        tokio::time::sleep(Duration::from_secs(3)).await;
        while let Ok(fired) = rx.try_recv() {
            assert!(!timers.accept(fired));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_previous_instance() {
        let (mut timers, mut rx) = TimerScheduler::new();
        timers.arm_once(Name::A, Duration::from_secs(1));
        timers.arm_once(Name::A, Duration::from_secs(10));

        let started = Instant::now();
        let fired = rx.recv().await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        assert!(timers.accept(fired));
    }

    #[tokio::test(start_paused = true)]
    async fn queued_firing_of_replaced_timer_is_stale() {
        let (mut timers, mut rx) = TimerScheduler::new();
        timers.arm_once(Name::B, Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(2)).await;

        // Fired and queued, but not yet consumed
        timers.arm_once(Name::B, Duration::from_secs(5));
        let stale = rx.recv().await.unwrap();
        assert!(!timers.accept(stale));
        assert!(timers.is_armed(Name::B));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_clears_everything() {
        let (mut timers, _rx) = TimerScheduler::new();
        timers.arm_once(Name::A, Duration::from_secs(1));
        timers.arm_periodic(Name::B, Duration::from_secs(1));
        assert_eq!(timers.armed().len(), 2);

        timers.cancel_all();
        assert!(timers.armed().is_empty());
    }
}
