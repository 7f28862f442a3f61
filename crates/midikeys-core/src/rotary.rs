// Midikeys Rotary State Tracker
// Encoder sample decoding, firing policies, and the shared per-control state map

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::combo::{DirectionalPair, KeyCombo};
use crate::input::event::ControlIdentity;

/// The encoder byte exactly between the two rotation sub-ranges.
pub const NEUTRAL_VALUE: u8 = 65;

/// Rotation direction decoded from one encoder sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Positive,
    Negative,
}

/// Decode an encoder byte: 1..=64 rotates positive (magnitude grows away
/// from 1), 66..=127 rotates negative (magnitude grows away from 127).
/// The neutral midpoint and the released sentinel decode to no motion.
pub fn direction_of(value: u8) -> Option<Direction> {
    match value {
        1..=64 => Some(Direction::Positive),
        66..=127 => Some(Direction::Negative),
        _ => None,
    }
}

/// Signed normalized magnitude in [-1.0, 1.0] for an encoder byte.
pub fn normalized_magnitude(value: u8) -> f32 {
    match value {
        1..=64 => (value - 1) as f32 / 63.0,
        66..=127 => -((127 - value) as f32 / 61.0),
        _ => 0.0,
    }
}

/// Firing policy selected for a control at classification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Count samples per direction; fire one pulse per threshold reached.
    ThresholdCounter,
    /// Smooth sample magnitude and fire pulses at a magnitude-scaled rate.
    ContinuousRate,
}

/// Per-policy mutable state. Kept as a tagged variant so a control only
/// ever carries the fields its own policy reads.
#[derive(Debug)]
enum PolicyState {
    Threshold {
        positive_count: u32,
        negative_count: u32,
        pending_positive: u32,
        pending_negative: u32,
    },
    Continuous {
        ema: f32,
        accumulator: f32,
    },
}

impl PolicyState {
    fn new(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::ThresholdCounter => PolicyState::Threshold {
                positive_count: 0,
                negative_count: 0,
                pending_positive: 0,
                pending_negative: 0,
            },
            PolicyKind::ContinuousRate => PolicyState::Continuous {
                ema: 0.0,
                accumulator: 0.0,
            },
        }
    }
}

/// Live state for one rotary control.
#[derive(Debug)]
struct RotaryState {
    last_value: u8,
    last_update: Instant,
    pair: DirectionalPair,
    policy: PolicyState,
}

/// Tuning parameters shared by both firing policies.
#[derive(Debug, Clone)]
pub struct RotaryParams {
    /// Samples per direction before a threshold-counter pulse fires.
    pub pulse_threshold: u32,
    /// EMA smoothing factor in (0, 1]; higher follows the encoder faster.
    pub alpha: f32,
    /// Normalized magnitude below which a sample counts as no motion.
    pub deadzone: f32,
    /// Exponent of the continuous-rate response curve.
    pub power: f32,
    /// Pulses per second at full encoder deflection.
    pub max_rate: f32,
    /// Silence after which a control's state is evicted.
    pub idle_timeout: Duration,
}

impl Default for RotaryParams {
    fn default() -> Self {
        Self {
            pulse_threshold: 15,
            alpha: 0.25,
            deadzone: 0.1,
            power: 1.3,
            max_rate: 80.0,
            idle_timeout: Duration::from_millis(350),
        }
    }
}

/// One due directional action, ready for dispatch outside the lock.
#[derive(Debug, Clone)]
pub struct Pulse {
    pub identity: ControlIdentity,
    pub direction: Direction,
    pub combo: KeyCombo,
}

struct TrackerInner {
    states: HashMap<ControlIdentity, RotaryState>,
    last_tick: Option<Instant>,
}

/// The single shared mutable resource of the engine: per-control rotary
/// state behind one lock.
///
/// Both writers (ingestion and the pulse scheduler) go through the atomic
/// operations here; neither holds the lock while dispatching.
pub struct RotaryTracker {
    params: RotaryParams,
    inner: Mutex<TrackerInner>,
}

impl RotaryTracker {
    pub fn new(params: RotaryParams) -> Self {
        Self {
            params,
            inner: Mutex::new(TrackerInner {
                states: HashMap::new(),
                last_tick: None,
            }),
        }
    }

    pub fn params(&self) -> &RotaryParams {
        &self.params
    }

    /// Fold one encoder sample into the control's state, creating the state
    /// on first contact. Timestamps come from the caller so the ingestion
    /// loop stamps a whole batch consistently (and tests stay deterministic).
    pub fn record_sample(
        &self,
        identity: ControlIdentity,
        value: u8,
        kind: PolicyKind,
        pair: &DirectionalPair,
        now: Instant,
    ) {
        let mut inner = self.inner.lock();
        let state = inner.states.entry(identity).or_insert_with(|| {
            log::debug!("tracking rotary control {}", identity);
            RotaryState {
                last_value: value,
                last_update: now,
                pair: pair.clone(),
                policy: PolicyState::new(kind),
            }
        });

        state.last_value = value;
        state.last_update = now;

        match &mut state.policy {
            PolicyState::Threshold {
                positive_count,
                negative_count,
                pending_positive,
                pending_negative,
            } => match direction_of(value) {
                Some(Direction::Positive) => {
                    *positive_count += 1;
                    if *positive_count >= self.params.pulse_threshold {
                        *positive_count = 0;
                        *pending_positive += 1;
                    }
                }
                Some(Direction::Negative) => {
                    *negative_count += 1;
                    if *negative_count >= self.params.pulse_threshold {
                        *negative_count = 0;
                        *pending_negative += 1;
                    }
                }
                None => {}
            },
            PolicyState::Continuous { ema, .. } => {
                let magnitude = normalized_magnitude(value);
                let input = if magnitude.abs() < self.params.deadzone {
                    0.0
                } else {
                    magnitude
                };
                *ema = self.params.alpha * input + (1.0 - self.params.alpha) * *ema;
            }
        }
    }

    /// One scheduler tick: evict idle controls, then compute the pulses due
    /// from each surviving control's policy. Runs entirely under the lock;
    /// the returned pulses are dispatched by the caller after it releases.
    pub fn collect_due(&self, now: Instant) -> Vec<Pulse> {
        let params = &self.params;
        let mut due = Vec::new();

        let mut inner = self.inner.lock();
        let dt = match inner.last_tick {
            Some(previous) => now.saturating_duration_since(previous).as_secs_f32(),
            None => 0.0,
        };
        inner.last_tick = Some(now);

        inner.states.retain(|identity, state| {
            if now.saturating_duration_since(state.last_update) > params.idle_timeout {
                log::debug!(
                    "evicting idle rotary control {} (last value {})",
                    identity,
                    state.last_value
                );
                return false;
            }

            match &mut state.policy {
                PolicyState::Threshold {
                    pending_positive,
                    pending_negative,
                    ..
                } => {
                    for _ in 0..*pending_positive {
                        due.push(Pulse {
                            identity: *identity,
                            direction: Direction::Positive,
                            combo: state.pair.positive.clone(),
                        });
                    }
                    for _ in 0..*pending_negative {
                        due.push(Pulse {
                            identity: *identity,
                            direction: Direction::Negative,
                            combo: state.pair.negative.clone(),
                        });
                    }
                    *pending_positive = 0;
                    *pending_negative = 0;
                }
                PolicyState::Continuous { ema, accumulator } => {
                    let magnitude = ema.abs();
                    if magnitude > 0.0 && dt > 0.0 {
                        *accumulator += params.max_rate * magnitude.powf(params.power) * dt;
                    }
                    let count = accumulator.floor();
                    if count >= 1.0 {
                        *accumulator -= count;
                        let direction = if *ema >= 0.0 {
                            Direction::Positive
                        } else {
                            Direction::Negative
                        };
                        let combo = match direction {
                            Direction::Positive => &state.pair.positive,
                            Direction::Negative => &state.pair.negative,
                        };
                        for _ in 0..count as u32 {
                            due.push(Pulse {
                                identity: *identity,
                                direction,
                                combo: combo.clone(),
                            });
                        }
                    }
                }
            }
            true
        });

        due
    }

    /// Number of controls currently tracked.
    pub fn active_controls(&self) -> usize {
        self.inner.lock().states.len()
    }
}
