// Midikeys Key Symbols
// Primary-key tokens from mapping descriptors and their uinput key codes

use std::fmt;
use std::str::FromStr;

use strum_macros::{Display, EnumString};

/// Named keys recognized by the descriptor symbol table.
///
/// Aliases follow the capture tool's vocabulary (`ArrowLeft`, `Return`, ...)
/// and match case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum NamedKey {
    #[strum(to_string = "Space")]
    Space,
    #[strum(to_string = "Left", serialize = "ArrowLeft")]
    Left,
    #[strum(to_string = "Right", serialize = "ArrowRight")]
    Right,
    #[strum(to_string = "Up", serialize = "ArrowUp")]
    Up,
    #[strum(to_string = "Down", serialize = "ArrowDown")]
    Down,
    #[strum(to_string = "PageUp")]
    PageUp,
    #[strum(to_string = "PageDown")]
    PageDown,
    #[strum(to_string = "Home")]
    Home,
    #[strum(to_string = "End")]
    End,
    #[strum(to_string = "Enter", serialize = "Return")]
    Enter,
    #[strum(to_string = "Tab")]
    Tab,
    #[strum(to_string = "Escape", serialize = "Esc")]
    Escape,
    #[strum(to_string = "Backspace")]
    Backspace,
    #[strum(to_string = "Delete", serialize = "Del")]
    Delete,
    #[strum(to_string = "Insert")]
    Insert,
}

impl NamedKey {
    /// Linux input-event-codes.h code for this key
    pub fn code(self) -> u16 {
        match self {
            NamedKey::Space => 57,
            NamedKey::Left => 105,
            NamedKey::Right => 106,
            NamedKey::Up => 103,
            NamedKey::Down => 108,
            NamedKey::PageUp => 104,
            NamedKey::PageDown => 109,
            NamedKey::Home => 102,
            NamedKey::End => 107,
            NamedKey::Enter => 28,
            NamedKey::Tab => 15,
            NamedKey::Escape => 1,
            NamedKey::Backspace => 14,
            NamedKey::Delete => 111,
            NamedKey::Insert => 110,
        }
    }
}

/// A primary key parsed from an action descriptor.
///
/// Tokens resolve against the [`NamedKey`] symbol table first, then as a
/// single printable character, and finally pass through unchanged so that
/// key names the injection layer understands (e.g. `F5`) keep working
/// without the parser having to know them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Named(NamedKey),
    Char(char),
    Other(String),
}

impl Key {
    /// Parse a primary-key token. Returns `None` for an empty token.
    pub fn parse(token: &str) -> Option<Key> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        if let Ok(named) = NamedKey::from_str(token) {
            return Some(Key::Named(named));
        }
        let mut chars = token.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            return Some(Key::Char(ch));
        }
        Some(Key::Other(token.to_string()))
    }

    /// Resolve this key to a uinput key code plus whether Shift is needed
    /// to produce it. Unresolvable keys return `None`; the dispatcher
    /// reports those as dispatch failures.
    pub fn code(&self) -> Option<(u16, bool)> {
        match self {
            Key::Named(named) => Some((named.code(), false)),
            Key::Char(ch) => ascii_code(*ch),
            Key::Other(name) => extended_code(name).map(|code| (code, false)),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Named(named) => write!(f, "{}", named),
            Key::Char(ch) => write!(f, "{}", ch),
            Key::Other(name) => write!(f, "{}", name),
        }
    }
}

fn letter_code(ch: char) -> Option<u16> {
    let code = match ch {
        'a' => 30,
        'b' => 48,
        'c' => 46,
        'd' => 32,
        'e' => 18,
        'f' => 33,
        'g' => 34,
        'h' => 35,
        'i' => 23,
        'j' => 36,
        'k' => 37,
        'l' => 38,
        'm' => 50,
        'n' => 49,
        'o' => 24,
        'p' => 25,
        'q' => 16,
        'r' => 19,
        's' => 31,
        't' => 20,
        'u' => 22,
        'v' => 47,
        'w' => 17,
        'x' => 45,
        'y' => 21,
        'z' => 44,
        _ => return None,
    };
    Some(code)
}

fn digit_code(ch: char) -> Option<u16> {
    match ch {
        '1'..='9' => Some(ch as u16 - '1' as u16 + 2),
        '0' => Some(11),
        _ => None,
    }
}

/// Map a printable ASCII character to its uinput key code and whether the
/// character requires Shift on a US layout.
pub fn ascii_code(ch: char) -> Option<(u16, bool)> {
    if ch.is_ascii_lowercase() {
        return letter_code(ch).map(|c| (c, false));
    }
    if ch.is_ascii_uppercase() {
        return letter_code(ch.to_ascii_lowercase()).map(|c| (c, true));
    }
    if ch.is_ascii_digit() {
        return digit_code(ch).map(|c| (c, false));
    }

    let (code, shift) = match ch {
        ' ' => (57, false),
        '\n' => (28, false),
        '\t' => (15, false),
        '-' => (12, false),
        '_' => (12, true),
        '=' => (13, false),
        '+' => (13, true),
        '[' => (26, false),
        '{' => (26, true),
        ']' => (27, false),
        '}' => (27, true),
        '\\' => (43, false),
        '|' => (43, true),
        ';' => (39, false),
        ':' => (39, true),
        '\'' => (40, false),
        '"' => (40, true),
        ',' => (51, false),
        '<' => (51, true),
        '.' => (52, false),
        '>' => (52, true),
        '/' => (53, false),
        '?' => (53, true),
        '`' => (41, false),
        '~' => (41, true),
        '!' => (2, true),
        '@' => (3, true),
        '#' => (4, true),
        '$' => (5, true),
        '%' => (6, true),
        '^' => (7, true),
        '&' => (8, true),
        '*' => (9, true),
        '(' => (10, true),
        ')' => (11, true),
        _ => return None,
    };
    Some((code, shift))
}

/// Resolve passthrough key names the symbol table does not cover.
fn extended_code(name: &str) -> Option<u16> {
    let code = match name.to_ascii_uppercase().as_str() {
        "F1" => 59,
        "F2" => 60,
        "F3" => 61,
        "F4" => 62,
        "F5" => 63,
        "F6" => 64,
        "F7" => 65,
        "F8" => 66,
        "F9" => 67,
        "F10" => 68,
        "F11" => 87,
        "F12" => 88,
        "KPENTER" => 96,
        "CAPSLOCK" => 58,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_key_aliases() {
        assert_eq!(Key::parse("Left"), Some(Key::Named(NamedKey::Left)));
        assert_eq!(Key::parse("arrowleft"), Some(Key::Named(NamedKey::Left)));
        assert_eq!(Key::parse("PAGEDOWN"), Some(Key::Named(NamedKey::PageDown)));
        assert_eq!(Key::parse("return"), Some(Key::Named(NamedKey::Enter)));
    }

    #[test]
    fn test_single_char_token() {
        assert_eq!(Key::parse("b"), Some(Key::Char('b')));
        assert_eq!(Key::parse("J"), Some(Key::Char('J')));
    }

    #[test]
    fn test_unknown_token_passes_through() {
        assert_eq!(Key::parse("F5"), Some(Key::Other("F5".to_string())));
        assert_eq!(
            Key::parse("MediaPlay"),
            Some(Key::Other("MediaPlay".to_string()))
        );
    }

    #[test]
    fn test_empty_token() {
        assert_eq!(Key::parse(""), None);
        assert_eq!(Key::parse("   "), None);
    }

    #[test]
    fn test_ascii_codes() {
        assert_eq!(ascii_code('a'), Some((30, false)));
        assert_eq!(ascii_code('A'), Some((30, true)));
        assert_eq!(ascii_code('1'), Some((2, false)));
        assert_eq!(ascii_code('0'), Some((11, false)));
        assert_eq!(ascii_code('!'), Some((2, true)));
        assert_eq!(ascii_code('\u{e9}'), None);
    }

    #[test]
    fn test_key_code_resolution() {
        assert_eq!(Key::Named(NamedKey::Space).code(), Some((57, false)));
        assert_eq!(Key::Char('B').code(), Some((48, true)));
        assert_eq!(Key::Other("F5".to_string()).code(), Some((63, false)));
        assert_eq!(Key::Other("NoSuchKey".to_string()).code(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Key::Named(NamedKey::PageDown).to_string(), "PageDown");
        assert_eq!(Key::Char('b').to_string(), "b");
        assert_eq!(Key::Other("F5".to_string()).to_string(), "F5");
    }
}
