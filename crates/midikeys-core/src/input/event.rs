// Midikeys Raw Event Model
// Typed MIDI events and the identity triple that keys the mapping table

use std::fmt;

use strum_macros::{Display, EnumString};

/// The two event classes a control can be mapped under.
///
/// String forms match the mapping store's `MIDI Type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum EventKind {
    #[strum(to_string = "note_on")]
    NoteOn,
    #[strum(to_string = "control_change")]
    ControlChange,
}

/// Identity of one physical control: event class, channel, and note or
/// controller number. `channel: None` is the "any channel" wildcard used by
/// mapping entries; events always carry a concrete channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlIdentity {
    pub kind: EventKind,
    pub channel: Option<u8>,
    pub number: u8,
}

impl ControlIdentity {
    pub fn new(kind: EventKind, channel: u8, number: u8) -> Self {
        Self {
            kind,
            channel: Some(channel),
            number,
        }
    }

    pub fn any_channel(kind: EventKind, number: u8) -> Self {
        Self {
            kind,
            channel: None,
            number,
        }
    }
}

impl fmt::Display for ControlIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel {
            Some(channel) => write!(f, "{} ch={} num={}", self.kind, channel, self.number),
            None => write!(f, "{} ch=* num={}", self.kind, self.number),
        }
    }
}

/// Raw MIDI message classes the engine consumes; everything else is
/// filtered out at the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    NoteOn,
    NoteOff,
    ControlChange,
}

/// One decoded event from the input port.
#[derive(Debug, Clone, Copy)]
pub struct RawControlEvent {
    pub kind: RawEventKind,
    pub channel: u8,
    /// Note number for note events, controller number for control changes.
    pub number: u8,
    /// Velocity for note events, controller value for control changes.
    pub value: u8,
    /// Port-relative timestamp reported by the MIDI backend.
    pub timestamp_ms: u32,
}
