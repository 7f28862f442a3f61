// Midikeys Core Library
// Control-surface event translation: MIDI in, synthetic keystrokes out

pub mod classify;
pub mod combo;
pub mod dispatch;
pub mod input;
pub mod key;
pub mod mapping;
pub mod modifier;
pub mod output;
pub mod rotary;
pub mod scheduler;
pub mod settings;

pub use classify::{Classified, EventClassifier, OverrideChannels, PRESS_THRESHOLD};
pub use combo::{Binding, DescriptorError, DirectionalPair, KeyCombo};
pub use dispatch::Dispatcher;
pub use input::{
    ControlIdentity, DeviceInfo, EventKind, MidiSource, RawControlEvent, RawEventKind, SourceError,
};
pub use key::{Key, NamedKey};
pub use mapping::{MappingError, MappingTable};
pub use modifier::Modifier;
pub use output::{KeySink, SinkError, UinputSink};
pub use rotary::{Direction, PolicyKind, Pulse, RotaryParams, RotaryTracker};
pub use scheduler::PulseScheduler;
pub use settings::{Settings, SettingsError};
