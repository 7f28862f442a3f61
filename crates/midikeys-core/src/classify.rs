// Midikeys Event Classifier
// Turns raw MIDI events into presses, rotary samples, or nothing

use std::collections::HashMap;
use std::sync::Arc;

use crate::combo::{Binding, DirectionalPair, KeyCombo};
use crate::input::event::{ControlIdentity, EventKind, RawControlEvent, RawEventKind};
use crate::key::{Key, NamedKey};
use crate::mapping::MappingTable;
use crate::modifier::Modifier;
use crate::rotary::PolicyKind;

/// Control-change value a simple mapped control must cross (from at or
/// below) for its press to fire.
pub const PRESS_THRESHOLD: u8 = 64;

/// Channels whose control changes are always rotary, mapping or not.
///
/// Each override channel carries the directional pair its pulses fire;
/// these take precedence over anything the mapping table says (the
/// hardware emits encoder bytes on these channels regardless of what the
/// user captured).
#[derive(Debug, Clone, Default)]
pub struct OverrideChannels {
    pairs: HashMap<u8, DirectionalPair>,
}

impl OverrideChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock jog-wheel layout: channel 1 scrubs, channel 2 shuttles
    /// with Ctrl held.
    pub fn defaults() -> Self {
        let mut overrides = Self::new();
        overrides.insert(1, DirectionalPair::default());
        overrides.insert(
            2,
            DirectionalPair {
                positive: KeyCombo {
                    modifiers: [Modifier::Ctrl].into_iter().collect(),
                    key: Key::Named(NamedKey::Right),
                },
                negative: KeyCombo {
                    modifiers: [Modifier::Ctrl].into_iter().collect(),
                    key: Key::Named(NamedKey::Left),
                },
            },
        );
        overrides
    }

    pub fn insert(&mut self, channel: u8, pair: DirectionalPair) {
        self.pairs.insert(channel, pair);
    }

    pub fn pair(&self, channel: u8) -> Option<&DirectionalPair> {
        self.pairs.get(&channel)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Classification result for one raw event.
#[derive(Debug, Clone)]
pub enum Classified {
    /// A discrete control fired; dispatch this combo once.
    Press(KeyCombo),
    /// An encoder moved; feed the sample to the rotary tracker.
    Rotary {
        identity: ControlIdentity,
        value: u8,
        policy: PolicyKind,
        pair: DirectionalPair,
    },
    /// Releases, unmapped controls, and sentinel values produce nothing.
    Discard,
}

/// Stateful classifier for the ingestion path.
///
/// Owns the per-control previous-value ledger used for threshold-press
/// crossing detection; only the ingestion thread touches it.
pub struct EventClassifier {
    table: Arc<MappingTable>,
    overrides: OverrideChannels,
    previous_values: HashMap<(u8, u8), u8>,
}

impl EventClassifier {
    pub fn new(table: Arc<MappingTable>, overrides: OverrideChannels) -> Self {
        Self {
            table,
            overrides,
            previous_values: HashMap::new(),
        }
    }

    pub fn classify(&mut self, event: &RawControlEvent) -> Classified {
        match event.kind {
            RawEventKind::NoteOff => Classified::Discard,
            RawEventKind::NoteOn if event.value == 0 => {
                // Momentary controls pair every press with a zero-velocity
                // note-on; only the press half maps to an action.
                Classified::Discard
            }
            RawEventKind::NoteOn => self.classify_note(event),
            RawEventKind::ControlChange => self.classify_control_change(event),
        }
    }

    fn classify_note(&self, event: &RawControlEvent) -> Classified {
        match self
            .table
            .resolve(EventKind::NoteOn, event.channel, event.number)
        {
            Some(Binding::Simple(combo)) => Classified::Press(combo.clone()),
            Some(Binding::Directional(_)) => {
                log::debug!(
                    "ignoring rotary binding on note control ch={} num={}",
                    event.channel,
                    event.number
                );
                Classified::Discard
            }
            None => Classified::Discard,
        }
    }

    fn classify_control_change(&mut self, event: &RawControlEvent) -> Classified {
        let previous = self
            .previous_values
            .insert((event.channel, event.number), event.value)
            .unwrap_or(0);

        // 0 is the released sentinel for continuous controls.
        if event.value == 0 {
            return Classified::Discard;
        }

        let identity = ControlIdentity::new(EventKind::ControlChange, event.channel, event.number);

        if let Some(pair) = self.overrides.pair(event.channel) {
            return Classified::Rotary {
                identity,
                value: event.value,
                policy: PolicyKind::ThresholdCounter,
                pair: pair.clone(),
            };
        }

        match self
            .table
            .resolve(EventKind::ControlChange, event.channel, event.number)
        {
            Some(Binding::Directional(pair)) => Classified::Rotary {
                identity,
                value: event.value,
                policy: PolicyKind::ContinuousRate,
                pair: pair.clone(),
            },
            Some(Binding::Simple(combo)) => {
                if previous <= PRESS_THRESHOLD && event.value > PRESS_THRESHOLD {
                    Classified::Press(combo.clone())
                } else {
                    Classified::Discard
                }
            }
            None => Classified::Discard,
        }
    }
}
