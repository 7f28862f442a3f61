// Midikeys Input Layer
// Raw MIDI event model and port handling

pub mod event;
pub mod source;

pub use event::{ControlIdentity, EventKind, RawControlEvent, RawEventKind};
pub use source::{list_input_devices, select_device, DeviceInfo, MidiSource, SourceError};
