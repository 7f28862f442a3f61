// Midikeys MIDI Source
// PortMidi input port enumeration, selection, and non-blocking polling

use portmidi as pm;

use crate::input::event::{RawControlEvent, RawEventKind};

/// Events read per poll; matches the port's backing buffer.
const READ_BUFFER: usize = 1024;

/// Errors that can occur on the MIDI input side.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("MIDI backend error: {0}")]
    Backend(String),

    #[error("no MIDI input ports found")]
    NoInputs,

    #[error("MIDI input port not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to read from MIDI input: {0}")]
    Read(String),
}

/// Input port information for listing ports.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Position in the input-port list (what the CLI selects by).
    pub index: usize,
    /// Backend device id.
    pub id: pm::PortMidiDeviceId,
    /// Port name as reported by the backend.
    pub name: String,
}

/// List all available MIDI input ports.
pub fn list_input_devices(context: &pm::PortMidi) -> Result<Vec<DeviceInfo>, SourceError> {
    let devices = context
        .devices()
        .map_err(|e| SourceError::Backend(format!("{:?}", e)))?;

    Ok(devices
        .into_iter()
        .filter(|d| d.is_input())
        .enumerate()
        .map(|(index, d)| DeviceInfo {
            index,
            id: d.id(),
            name: d.name().to_string(),
        })
        .collect())
}

/// Select an input port by list index or case-insensitive name substring;
/// with no selector the first available port wins.
pub fn select_device(
    context: &pm::PortMidi,
    selector: Option<&str>,
) -> Result<pm::DeviceInfo, SourceError> {
    let devices = context
        .devices()
        .map_err(|e| SourceError::Backend(format!("{:?}", e)))?;
    let inputs: Vec<pm::DeviceInfo> = devices.into_iter().filter(|d| d.is_input()).collect();

    if inputs.is_empty() {
        return Err(SourceError::NoInputs);
    }

    let Some(selector) = selector else {
        let first = inputs.into_iter().next().unwrap();
        log::info!("using first MIDI input port: {}", first.name());
        return Ok(first);
    };

    if let Ok(index) = selector.parse::<usize>() {
        return inputs
            .into_iter()
            .nth(index)
            .ok_or_else(|| SourceError::DeviceNotFound(selector.to_string()));
    }

    let needle = selector.to_lowercase();
    inputs
        .into_iter()
        .find(|d| d.name().to_lowercase().contains(&needle))
        .ok_or_else(|| SourceError::DeviceNotFound(selector.to_string()))
}

/// A connected MIDI input port yielding decoded control events.
///
/// Polling is non-blocking; the ingestion loop adds its own idle sleep when
/// nothing is pending.
pub struct MidiSource<'a> {
    port: pm::InputPort<'a>,
    name: String,
}

impl<'a> MidiSource<'a> {
    /// Open an input port on the given device.
    pub fn open(context: &'a pm::PortMidi, device: pm::DeviceInfo) -> Result<Self, SourceError> {
        let name = device.name().to_string();
        let port = context
            .input_port(device, READ_BUFFER)
            .map_err(|e| SourceError::Backend(format!("{:?}", e)))?;
        Ok(Self { port, name })
    }

    /// Name of the connected port.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drain all pending events from the port, decoded into typed control
    /// events. Returns an empty vector when nothing is pending.
    pub fn poll_events(&mut self) -> Result<Vec<RawControlEvent>, SourceError> {
        let ready = self
            .port
            .poll()
            .map_err(|e| SourceError::Read(format!("{:?}", e)))?;
        if !ready {
            return Ok(Vec::new());
        }

        let events = self
            .port
            .read_n(READ_BUFFER)
            .map_err(|e| SourceError::Read(format!("{:?}", e)))?
            .unwrap_or_default();

        Ok(events.iter().filter_map(|e| decode_event(e)).collect())
    }
}

/// Decode one backend event into the engine's raw event model. Message
/// classes other than note-on, note-off, and control-change are dropped.
fn decode_event(event: &pm::MidiEvent) -> Option<RawControlEvent> {
    let status = event.message.status;
    let channel = status & 0x0F;
    let kind = match status & 0xF0 {
        0x90 => RawEventKind::NoteOn,
        0x80 => RawEventKind::NoteOff,
        0xB0 => RawEventKind::ControlChange,
        _ => return None,
    };

    Some(RawControlEvent {
        kind,
        channel,
        number: event.message.data1,
        value: event.message.data2,
        timestamp_ms: event.timestamp as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn midi_event(status: u8, data1: u8, data2: u8) -> pm::MidiEvent {
        pm::MidiEvent {
            message: pm::MidiMessage {
                status,
                data1,
                data2,
                data3: 0,
            },
            timestamp: 0,
        }
    }

    #[test]
    fn test_decode_note_on() {
        let event = decode_event(&midi_event(0x95, 60, 100)).unwrap();
        assert_eq!(event.kind, RawEventKind::NoteOn);
        assert_eq!(event.channel, 5);
        assert_eq!(event.number, 60);
        assert_eq!(event.value, 100);
    }

    #[test]
    fn test_decode_note_off() {
        let event = decode_event(&midi_event(0x80, 60, 0)).unwrap();
        assert_eq!(event.kind, RawEventKind::NoteOff);
        assert_eq!(event.channel, 0);
    }

    #[test]
    fn test_decode_control_change() {
        let event = decode_event(&midi_event(0xB1, 17, 10)).unwrap();
        assert_eq!(event.kind, RawEventKind::ControlChange);
        assert_eq!(event.channel, 1);
        assert_eq!(event.number, 17);
        assert_eq!(event.value, 10);
    }

    #[test]
    fn test_decode_ignores_other_status() {
        // Pitch bend and system messages are not control events.
        assert!(decode_event(&midi_event(0xE0, 0, 64)).is_none());
        assert!(decode_event(&midi_event(0xF8, 0, 0)).is_none());
    }
}
