//! The panic keyboard shortcut.

use std::fmt;

/// Where keyboard focus is when a key arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Focus is on the page itself or a button.
    Page,
    /// Focus is inside a text field; typed keys belong to the field.
    TextInput,
}

/// A single key that fires the panic sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanicShortcut {
    key: char,
}

impl Default for PanicShortcut {
    fn default() -> Self {
        Self { key: 'p' }
    }
}

impl fmt::Display for PanicShortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

impl PanicShortcut {
    /// Parse a key binding. It must be exactly one visible character.
    #[must_use]
    pub fn parse(binding: &str) -> Option<Self> {
        let mut chars = binding.trim().chars();
        let key = chars.next()?;
        if chars.next().is_some() || key.is_control() || key.is_whitespace() {
            return None;
        }
        Some(Self {
            key: key.to_ascii_lowercase(),
        })
    }

    /// The bound key, lowercased.
    #[must_use]
    pub fn key(&self) -> char {
        self.key
    }

    /// Whether `key` pressed with `focus` should fire the panic sequence.
    ///
    /// Matching ignores case. Keys typed into a text field never trigger.
    #[must_use]
    pub fn triggers(&self, key: char, focus: Focus) -> bool {
        focus != Focus::TextInput && key.eq_ignore_ascii_case(&self.key)
    }
}
