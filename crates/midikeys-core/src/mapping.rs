// Midikeys Mapping Table
// Control identity -> parsed binding, loaded once from the capture CSV

use std::io;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::combo::Binding;
use crate::input::event::{ControlIdentity, EventKind};

/// Errors that can occur while reading the mapping store.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("failed to read mapping store: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse mapping store: {0}")]
    Csv(#[from] csv::Error),
}

/// One row of the capture tool's CSV. `Observed Values` and `Notes` are
/// capture annotations the loader does not read.
#[derive(Debug, serde::Deserialize)]
struct MappingRecord {
    #[serde(rename = "Control")]
    control: String,

    #[serde(rename = "MIDI Type")]
    midi_type: String,

    #[serde(rename = "Channel")]
    channel: String,

    #[serde(rename = "Number (Note/CC)")]
    number: String,

    #[serde(rename = "Desired Keystroke/Action")]
    desired: String,
}

/// Immutable lookup from control identity to parsed binding.
///
/// Exact-channel entries take precedence over "any channel" entries. Rows
/// that fail to parse are skipped individually; a missing or unreadable
/// store yields an empty table so the engine still runs, emitting nothing.
#[derive(Debug, Default)]
pub struct MappingTable {
    entries: IndexMap<ControlIdentity, Binding>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding, replacing any existing entry for the identity.
    pub fn insert(&mut self, identity: ControlIdentity, binding: Binding) {
        if self.entries.insert(identity, binding).is_some() {
            log::debug!("mapping for {} replaced by a later row", identity);
        }
    }

    /// Load the table from a CSV path, tolerating a missing or unreadable
    /// file by starting empty.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::File::open(path) {
            Ok(file) => match Self::from_reader(file) {
                Ok(table) => {
                    log::info!("loaded {} mappings from {}", table.len(), path.display());
                    table
                }
                Err(e) => {
                    log::warn!("unusable mapping store {}: {}", path.display(), e);
                    Self::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("no mapping store at {}; starting with an empty table", path.display());
                Self::new()
            }
            Err(e) => {
                log::warn!("cannot open mapping store {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    /// Parse the table from any CSV reader. Malformed rows are skipped with
    /// a warning; only an unreadable header fails the whole parse.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, MappingError> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let mut table = Self::new();
        for record in csv_reader.deserialize::<MappingRecord>() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("skipping malformed mapping row: {}", e);
                    continue;
                }
            };
            if let Some((identity, binding)) = parse_row(&record) {
                table.insert(identity, binding);
            }
        }
        Ok(table)
    }

    /// Resolve a concrete control to its binding: exact channel first, then
    /// the channel wildcard.
    pub fn resolve(&self, kind: EventKind, channel: u8, number: u8) -> Option<&Binding> {
        self.entries
            .get(&ControlIdentity::new(kind, channel, number))
            .or_else(|| self.entries.get(&ControlIdentity::any_channel(kind, number)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_row(record: &MappingRecord) -> Option<(ControlIdentity, Binding)> {
    let number = record.number.trim();
    if number.is_empty() {
        log::debug!("skipping row '{}' with no note/CC number", record.control);
        return None;
    }
    let number: u8 = match number.parse() {
        Ok(number) => number,
        Err(_) => {
            log::warn!(
                "skipping row '{}': bad note/CC number '{}'",
                record.control,
                record.number
            );
            return None;
        }
    };

    let kind = match EventKind::from_str(record.midi_type.trim()) {
        Ok(kind) => kind,
        Err(_) => {
            log::warn!(
                "skipping row '{}': unsupported MIDI type '{}'",
                record.control,
                record.midi_type
            );
            return None;
        }
    };

    let channel = record.channel.trim();
    let channel: Option<u8> = if channel.is_empty() {
        None
    } else {
        match channel.parse() {
            Ok(channel) => Some(channel),
            Err(_) => {
                log::warn!(
                    "skipping row '{}': bad channel '{}'",
                    record.control,
                    record.channel
                );
                return None;
            }
        }
    };

    let desired = record.desired.trim();
    if desired.is_empty() {
        log::debug!("skipping row '{}' with no keystroke", record.control);
        return None;
    }
    let binding = match Binding::parse(desired) {
        Ok(binding) => binding,
        Err(e) => {
            log::warn!("skipping row '{}': {}", record.control, e);
            return None;
        }
    };

    let identity = ControlIdentity {
        kind,
        channel,
        number,
    };
    log::debug!("mapping {} -> {}", identity, binding);
    Some((identity, binding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{Key, NamedKey};

    const HEADER: &str =
        "Control,MIDI Type,Channel,Number (Note/CC),Observed Values,Desired Keystroke/Action,Notes\n";

    fn table_from(rows: &str) -> MappingTable {
        let csv = format!("{}{}", HEADER, rows);
        MappingTable::from_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_load_basic_rows() {
        let table = table_from(
            "Play,note_on,5,60,127,Space,\n\
             Jog L,control_change,1,17,1-64/66-127,Jog:Right/Left,wheel\n",
        );
        assert_eq!(table.len(), 2);

        let binding = table.resolve(EventKind::NoteOn, 5, 60).unwrap();
        assert_eq!(binding.to_string(), "Space");

        let binding = table.resolve(EventKind::ControlChange, 1, 17).unwrap();
        assert!(binding.is_directional());
    }

    #[test]
    fn test_exact_channel_beats_wildcard() {
        let table = table_from(
            "Any,note_on,,60,,a,\n\
             Exact,note_on,5,60,,b,\n",
        );
        assert_eq!(
            table.resolve(EventKind::NoteOn, 5, 60).unwrap().to_string(),
            "b"
        );
        // Other channels fall back to the wildcard entry.
        assert_eq!(
            table.resolve(EventKind::NoteOn, 2, 60).unwrap().to_string(),
            "a"
        );
    }

    #[test]
    fn test_unmapped_control() {
        let table = table_from("Play,note_on,5,60,,Space,\n");
        assert!(table.resolve(EventKind::NoteOn, 5, 61).is_none());
        assert!(table.resolve(EventKind::ControlChange, 5, 60).is_none());
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let table = table_from(
            "NoNumber,note_on,5,,,Space,\n\
             BadNumber,note_on,5,lots,,Space,\n\
             BadType,pitchwheel,5,60,,Space,\n\
             BadChannel,note_on,five,60,,Space,\n\
             NoKeystroke,note_on,5,61,,,\n\
             Good,note_on,5,62,,Enter,\n",
        );
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.resolve(EventKind::NoteOn, 5, 62).unwrap().to_string(),
            "Enter"
        );
    }

    #[test]
    fn test_later_row_wins() {
        let table = table_from(
            "First,note_on,5,60,,a,\n\
             Second,note_on,5,60,,b,\n",
        );
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.resolve(EventKind::NoteOn, 5, 60).unwrap().to_string(),
            "b"
        );
    }

    #[test]
    fn test_missing_file_yields_empty_table() {
        let table = MappingTable::load("/nonexistent/mappings.csv");
        assert!(table.is_empty());
    }

    #[test]
    fn test_programmatic_insert() {
        let mut table = MappingTable::new();
        table.insert(
            ControlIdentity::new(EventKind::NoteOn, 0, 1),
            Binding::Simple(crate::combo::KeyCombo::plain(Key::Named(NamedKey::Tab))),
        );
        assert_eq!(table.len(), 1);
    }
}
