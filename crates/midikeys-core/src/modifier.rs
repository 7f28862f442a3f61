// Midikeys Modifier System
// Combo modifiers (Ctrl, Shift, Alt) from mapping descriptors

use std::fmt;
use std::str::FromStr;

use strum_macros::{Display, EnumString};

/// Keyboard modifiers a descriptor may prefix a primary key with.
///
/// Token matching is case-insensitive; `Control` and `Menu` are accepted as
/// aliases for `Ctrl` and `Alt` respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Modifier {
    #[strum(to_string = "Ctrl", serialize = "Control")]
    Ctrl,
    #[strum(to_string = "Shift")]
    Shift,
    #[strum(to_string = "Alt", serialize = "Menu")]
    Alt,
}

impl Modifier {
    /// Parse a modifier token, trimming surrounding whitespace.
    pub fn parse(token: &str) -> Option<Modifier> {
        Modifier::from_str(token.trim()).ok()
    }

    /// Linux input-event-codes.h code emitted for this modifier (the left
    /// variant of each modifier key).
    pub fn code(self) -> u16 {
        match self {
            Modifier::Ctrl => 29,
            Modifier::Shift => 42,
            Modifier::Alt => 56,
        }
    }
}

/// Formats a modifier list the way descriptors spell it: `Ctrl+Shift+`.
pub(crate) fn fmt_modifiers(modifiers: &[Modifier], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for modifier in modifiers {
        write!(f, "{}+", modifier)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_aliases() {
        assert_eq!(Modifier::parse("ctrl"), Some(Modifier::Ctrl));
        assert_eq!(Modifier::parse("Control"), Some(Modifier::Ctrl));
        assert_eq!(Modifier::parse("SHIFT"), Some(Modifier::Shift));
        assert_eq!(Modifier::parse("menu"), Some(Modifier::Alt));
        assert_eq!(Modifier::parse(" alt "), Some(Modifier::Alt));
    }

    #[test]
    fn test_unknown_modifier() {
        assert_eq!(Modifier::parse("Hyper"), None);
        assert_eq!(Modifier::parse(""), None);
    }

    #[test]
    fn test_modifier_codes() {
        assert_eq!(Modifier::Ctrl.code(), 29);
        assert_eq!(Modifier::Shift.code(), 42);
        assert_eq!(Modifier::Alt.code(), 56);
    }
}
