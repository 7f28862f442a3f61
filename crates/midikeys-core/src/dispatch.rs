// Midikeys Action Dispatcher
// Drives the injection sink, or reports combos without side effects

use crate::combo::KeyCombo;
use crate::output::{KeySink, SinkError};

/// Executes parsed combos against the injection sink.
///
/// In dry-run mode there is no sink and every combo is only logged.
/// Injection failures are logged and swallowed; one bad dispatch never
/// stops the stream.
pub struct Dispatcher {
    sink: Option<Box<dyn KeySink>>,
}

impl Dispatcher {
    pub fn new(sink: Box<dyn KeySink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn dry_run() -> Self {
        Self { sink: None }
    }

    pub fn is_dry_run(&self) -> bool {
        self.sink.is_none()
    }

    /// Send one combo: modifiers down in listed order, key tap, modifiers
    /// up in reverse order.
    pub fn dispatch(&mut self, combo: &KeyCombo) {
        let Some(sink) = self.sink.as_mut() else {
            log::info!("[dry-run] would send {}", combo);
            return;
        };

        match send_combo(sink.as_mut(), combo) {
            Ok(()) => log::debug!("sent {}", combo),
            Err(e) => {
                log::warn!("failed to send {}: {}", combo, e);
                // Don't leave modifiers held behind a failed send.
                for modifier in combo.modifiers.iter().rev() {
                    let _ = sink.release_modifier(*modifier);
                }
            }
        }
    }
}

fn send_combo(sink: &mut dyn KeySink, combo: &KeyCombo) -> Result<(), SinkError> {
    for modifier in &combo.modifiers {
        sink.press_modifier(*modifier)?;
    }
    sink.press_key(&combo.key)?;
    sink.release_key(&combo.key)?;
    for modifier in combo.modifiers.iter().rev() {
        sink.release_modifier(*modifier)?;
    }
    Ok(())
}
