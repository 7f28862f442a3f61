// Midikeys Output Layer
// Keystroke injection interface and the uinput implementation

pub mod uinput;

pub use uinput::UinputSink;

use crate::key::Key;
use crate::modifier::Modifier;

/// Error types for keystroke injection.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("failed to write key event: {0}")]
    WriteError(String),

    #[error("no key code for '{0}'")]
    UnknownKey(String),
}

/// Keystroke injection primitives the dispatcher drives.
///
/// Implementations only ever receive balanced press/release sequences; the
/// dispatcher owns ordering (modifiers down, key tap, modifiers up).
pub trait KeySink: Send {
    fn press_key(&mut self, key: &Key) -> Result<(), SinkError>;
    fn release_key(&mut self, key: &Key) -> Result<(), SinkError>;
    fn press_modifier(&mut self, modifier: Modifier) -> Result<(), SinkError>;
    fn release_modifier(&mut self, modifier: Modifier) -> Result<(), SinkError>;
}
