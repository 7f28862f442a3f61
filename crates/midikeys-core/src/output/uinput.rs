// Midikeys uinput Sink
// Virtual keyboard device creation and key event emission

use evdev::{EventType, InputEvent};

use super::{KeySink, SinkError};
use crate::key::Key;
use crate::modifier::Modifier;

/// Virtual uinput keyboard for key output.
pub struct UinputSink {
    device: evdev::uinput::VirtualDevice,
}

impl UinputSink {
    /// Create the virtual keyboard device.
    pub fn new() -> Result<Self, SinkError> {
        use evdev::uinput::VirtualDeviceBuilder;
        use evdev::AttributeSet;

        // Register all standard keyboard keys so passthrough key names work.
        let mut keys = AttributeSet::new();
        for code in 0..256u16 {
            keys.insert(evdev::Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| SinkError::DeviceCreation(e.to_string()))?
            .name("Midikeys (virtual) Keyboard")
            .with_keys(&keys)
            .map_err(|e: std::io::Error| SinkError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| SinkError::DeviceCreation(e.to_string()))?;

        Ok(Self { device })
    }

    fn emit(&mut self, code: u16, pressed: bool) -> Result<(), SinkError> {
        let value = if pressed { 1 } else { 0 };
        let key_event = InputEvent::new(EventType::KEY, code, value);
        // SYN event is required for the kernel to process the key event
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);

        self.device
            .emit(&[key_event, syn_event])
            .map_err(|e: std::io::Error| SinkError::WriteError(e.to_string()))
    }

    fn resolve(key: &Key) -> Result<(u16, bool), SinkError> {
        key.code()
            .ok_or_else(|| SinkError::UnknownKey(key.to_string()))
    }
}

impl KeySink for UinputSink {
    fn press_key(&mut self, key: &Key) -> Result<(), SinkError> {
        let (code, needs_shift) = Self::resolve(key)?;
        if needs_shift {
            self.emit(Modifier::Shift.code(), true)?;
        }
        self.emit(code, true)
    }

    fn release_key(&mut self, key: &Key) -> Result<(), SinkError> {
        let (code, needs_shift) = Self::resolve(key)?;
        self.emit(code, false)?;
        if needs_shift {
            self.emit(Modifier::Shift.code(), false)?;
        }
        Ok(())
    }

    fn press_modifier(&mut self, modifier: Modifier) -> Result<(), SinkError> {
        self.emit(modifier.code(), true)
    }

    fn release_modifier(&mut self, modifier: Modifier) -> Result<(), SinkError> {
        self.emit(modifier.code(), false)
    }
}
