use std::collections::HashSet;

/// Maximum number of entries shown in the display buffer.
pub const DISPLAY_CAPACITY: usize = 5;

/// One reported unit of sync progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessLogEntry {
    /// Display key; the series title on the wire.
    pub identifier: String,
}

impl ProcessLogEntry {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

/// Bounded, most-recent-first list of progress entries.
///
/// Only constructible from a full push payload, so it is always rebuilt
/// and never grows across events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayBuffer(Vec<ProcessLogEntry>);

impl DisplayBuffer {
    /// Builds the buffer from a payload delivered oldest-first.
    ///
    /// The payload is reversed, repeated identifiers keep only their most
    /// recent occurrence, and the result is cut to [`DISPLAY_CAPACITY`].
    /// A payload is therefore shortened by its repeats: six entries with
    /// fewer than five distinct identifiers yield fewer than five.
    pub fn from_oldest_first(entries: &[ProcessLogEntry]) -> Self {
        let mut seen = HashSet::new();
        let newest_first = entries
            .iter()
            .rev()
            .filter(|entry| seen.insert(entry.identifier.as_str()))
            .take(DISPLAY_CAPACITY)
            .cloned()
            .collect();
        Self(newest_first)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessLogEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identifiers in display order.
    pub fn identifiers(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.identifier.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(ids: &[&str]) -> Vec<ProcessLogEntry> {
        ids.iter().map(|id| ProcessLogEntry::new(*id)).collect()
    }

    #[test]
    fn test_reverses_oldest_first_payload() {
        let buffer = DisplayBuffer::from_oldest_first(&entries(&["A", "B", "C"]));
        assert_eq!(buffer.identifiers(), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_keeps_five_most_recent() {
        let buffer =
            DisplayBuffer::from_oldest_first(&entries(&["X", "Y", "Z", "W", "V", "U"]));
        assert_eq!(buffer.len(), DISPLAY_CAPACITY);
        assert_eq!(buffer.identifiers(), vec!["U", "V", "W", "Z", "Y"]);
    }

    #[test]
    fn test_large_payload_is_capped() {
        let ids: Vec<String> = (0..40).map(|i| format!("show-{i}")).collect();
        let payload: Vec<_> = ids.iter().map(ProcessLogEntry::new).collect();
        let buffer = DisplayBuffer::from_oldest_first(&payload);
        assert_eq!(
            buffer.identifiers(),
            vec!["show-39", "show-38", "show-37", "show-36", "show-35"]
        );
    }

    #[test]
    fn test_duplicate_identifier_keeps_latest_position() {
        let buffer = DisplayBuffer::from_oldest_first(&entries(&["A", "B", "A", "C"]));
        assert_eq!(buffer.identifiers(), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_repeats_shorten_a_full_payload() {
        let same = DisplayBuffer::from_oldest_first(&entries(&["A", "A", "A", "A", "A", "A"]));
        assert_eq!(same.identifiers(), vec!["A"]);

        let one_repeat =
            DisplayBuffer::from_oldest_first(&entries(&["X", "Y", "Z", "W", "V", "V"]));
        assert_eq!(one_repeat.identifiers(), vec!["V", "W", "Z", "Y", "X"]);

        let two_repeats =
            DisplayBuffer::from_oldest_first(&entries(&["X", "Y", "X", "W", "Y", "V"]));
        assert_eq!(two_repeats.identifiers(), vec!["V", "Y", "W", "X"]);
    }

    #[test]
    fn test_empty_payload() {
        let buffer = DisplayBuffer::from_oldest_first(&[]);
        assert!(buffer.is_empty());
    }
}
