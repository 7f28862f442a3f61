// Midikeys Combo and Binding Grammar
// Action descriptors parsed once at load time, never re-parsed per event

use std::fmt;

use smallvec::SmallVec;

use crate::key::{Key, NamedKey};
use crate::modifier::{fmt_modifiers, Modifier};

/// Errors produced while parsing an action descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("empty action descriptor")]
    Empty,

    #[error("descriptor '{0}' has no primary key token")]
    MissingKey(String),
}

/// A dispatchable keystroke: zero or more modifiers around one primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
    pub modifiers: SmallVec<[Modifier; 2]>,
    pub key: Key,
}

impl KeyCombo {
    /// Combo with no modifiers.
    pub fn plain(key: Key) -> Self {
        Self {
            modifiers: SmallVec::new(),
            key,
        }
    }

    /// Parse a `Modifier+...+Primary` token sequence.
    ///
    /// Unknown modifier tokens are skipped with a warning rather than
    /// failing the whole descriptor; the primary token must resolve.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(DescriptorError::Empty);
        }

        let mut parts: Vec<&str> = descriptor.split('+').collect();
        let primary = parts.pop().unwrap_or_default();

        let mut modifiers = SmallVec::new();
        for part in parts {
            match Modifier::parse(part) {
                Some(modifier) => modifiers.push(modifier),
                None => log::warn!("ignoring unknown modifier token '{}'", part.trim()),
            }
        }

        let key = Key::parse(primary)
            .ok_or_else(|| DescriptorError::MissingKey(descriptor.to_string()))?;

        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_modifiers(&self.modifiers, f)?;
        write!(f, "{}", self.key)
    }
}

/// The combos fired for positive and negative rotation of one control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionalPair {
    pub positive: KeyCombo,
    pub negative: KeyCombo,
}

impl Default for DirectionalPair {
    /// Canonical pair used when a rotary descriptor names no tokens.
    fn default() -> Self {
        Self {
            positive: KeyCombo::plain(Key::Named(NamedKey::Right)),
            negative: KeyCombo::plain(Key::Named(NamedKey::Left)),
        }
    }
}

impl fmt::Display for DirectionalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.positive, self.negative)
    }
}

/// A parsed action descriptor.
///
/// `Simple` fires one combo per trigger; `Directional` is the rotary form
/// (`"...jog...:Pos/Neg"`) carrying one combo per rotation direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Simple(KeyCombo),
    Directional(DirectionalPair),
}

impl Binding {
    /// Parse a full action descriptor string.
    ///
    /// A descriptor whose text before any colon contains `jog`
    /// (case-insensitively) is a rotary action; the tokens after the colon,
    /// separated by `/`, override the default `Right`/`Left` pair.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(DescriptorError::Empty);
        }

        let (head, tail) = match descriptor.split_once(':') {
            Some((head, tail)) => (head, Some(tail)),
            None => (descriptor, None),
        };

        if !head.to_ascii_lowercase().contains("jog") {
            return Ok(Binding::Simple(KeyCombo::parse(descriptor)?));
        }

        let mut pair = DirectionalPair::default();
        if let Some(tail) = tail {
            let mut tokens = tail.split('/').map(str::trim).filter(|t| !t.is_empty());
            if let Some(positive) = tokens.next() {
                pair.positive = KeyCombo::parse(positive)?;
            }
            if let Some(negative) = tokens.next() {
                pair.negative = KeyCombo::parse(negative)?;
            }
        }
        Ok(Binding::Directional(pair))
    }

    /// True for the rotary (directional) form.
    pub fn is_directional(&self) -> bool {
        matches!(self, Binding::Directional(_))
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Simple(combo) => write!(f, "{}", combo),
            Binding::Directional(pair) => write!(f, "Jog:{}", pair),
        }
    }
}
