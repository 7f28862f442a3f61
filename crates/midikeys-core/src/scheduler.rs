// Midikeys Pulse Scheduler
// Periodic background thread converting rotary state into dispatches

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::dispatch::Dispatcher;
use crate::rotary::RotaryTracker;

/// Background loop that ticks the rotary tracker and dispatches the pulses
/// it returns.
///
/// The tracker does all its work under its own lock; dispatching happens
/// here, after the lock is gone, so a slow injection never stalls the
/// ingestion path.
pub struct PulseScheduler {
    tracker: Arc<RotaryTracker>,
    dispatcher: Arc<Mutex<Dispatcher>>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl PulseScheduler {
    pub fn new(
        tracker: Arc<RotaryTracker>,
        dispatcher: Arc<Mutex<Dispatcher>>,
        interval: Duration,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tracker,
            dispatcher,
            interval,
            running,
        }
    }

    /// Start the scheduler thread. It runs until the shared running flag
    /// clears, then exits after the current tick.
    pub fn spawn(self) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("pulse-scheduler".to_string())
            .spawn(move || self.run())
    }

    fn run(self) {
        log::debug!("pulse scheduler ticking every {:?}", self.interval);
        while self.running.load(Ordering::SeqCst) {
            let due = self.tracker.collect_due(Instant::now());
            for pulse in due {
                log::debug!(
                    "pulse {} {:?} -> {}",
                    pulse.identity,
                    pulse.direction,
                    pulse.combo
                );
                self.dispatcher.lock().dispatch(&pulse.combo);
            }
            thread::sleep(self.interval);
        }
        log::debug!("pulse scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combo::DirectionalPair;
    use crate::input::event::{ControlIdentity, EventKind};
    use crate::key::Key;
    use crate::modifier::Modifier;
    use crate::output::{KeySink, SinkError};
    use crate::rotary::{PolicyKind, RotaryParams};

    struct CountingSink {
        presses: Arc<Mutex<Vec<String>>>,
    }

    impl KeySink for CountingSink {
        fn press_key(&mut self, key: &Key) -> Result<(), SinkError> {
            self.presses.lock().push(key.to_string());
            Ok(())
        }
        fn release_key(&mut self, _key: &Key) -> Result<(), SinkError> {
            Ok(())
        }
        fn press_modifier(&mut self, _modifier: Modifier) -> Result<(), SinkError> {
            Ok(())
        }
        fn release_modifier(&mut self, _modifier: Modifier) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn test_scheduler_fires_and_stops() {
        let presses = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Arc::new(Mutex::new(Dispatcher::new(Box::new(CountingSink {
            presses: presses.clone(),
        }))));
        let tracker = Arc::new(RotaryTracker::new(RotaryParams::default()));
        let running = Arc::new(AtomicBool::new(true));

        let handle = PulseScheduler::new(
            tracker.clone(),
            dispatcher,
            Duration::from_millis(5),
            running.clone(),
        )
        .spawn()
        .unwrap();

        // Reach the pulse threshold; the scheduler thread must pick it up.
        let id = ControlIdentity::new(EventKind::ControlChange, 1, 17);
        let pair = DirectionalPair::default();
        let now = Instant::now();
        for _ in 0..15 {
            tracker.record_sample(id, 10, PolicyKind::ThresholdCounter, &pair, now);
        }

        let deadline = Instant::now() + Duration::from_secs(1);
        while presses.lock().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(*presses.lock(), vec!["Right".to_string()]);

        running.store(false, Ordering::SeqCst);
        handle.join().unwrap();
    }
}
