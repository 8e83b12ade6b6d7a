//! Application payload layer

use crate::field::{render_bytes, FieldRow};
use std::fmt::{self, Write};

/// Bytes carried after the last header
///
/// Unset bytes behave like an empty payload when matching, but only a set
/// value overrides another payload when merging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Option<Vec<u8>>,
}

impl Payload {
    /// Layer name used in dumps and diffs
    pub const NAME: &'static str = "Payload";

    pub fn new(bytes: Vec<u8>) -> Self {
        Payload { bytes: Some(bytes) }
    }

    /// The payload bytes, empty when unset
    pub fn data(&self) -> &[u8] {
        self.bytes.as_deref().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    pub fn matches(&self, other: &Self) -> bool {
        self.data() == other.data()
    }

    pub fn merge_from(&mut self, other: &Self) {
        crate::field::merge_field(&mut self.bytes, &other.bytes);
    }

    /// An empty payload has nothing worth listing
    pub fn set_fields(&self) -> Vec<(&'static str, String)> {
        if self.is_empty() {
            Vec::new()
        } else {
            vec![("Bytes", render_bytes(self.data()))]
        }
    }

    pub(crate) fn mismatched_fields(&self, other: &Self) -> Vec<FieldRow> {
        if self.matches(other) {
            return Vec::new();
        }
        // Unset and empty both render blank
        let render = |payload: &Payload| match payload.data() {
            [] => String::new(),
            bytes => render_bytes(bytes),
        };
        vec![("Bytes", render(self), render(other))]
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bytes {
            Some(bytes) => write!(f, "{}{{Bytes:\n{}}}", Self::NAME, hex_dump(bytes)),
            None => write!(f, "{}{{}}", Self::NAME),
        }
    }
}

/// Canonical hex dump: offset, sixteen hex bytes split in two groups of
/// eight, and a printable-ASCII gutter
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(16).enumerate() {
        let _ = write!(out, "{:08x}  ", line * 16);
        for i in 0..16 {
            match chunk.get(i) {
                Some(byte) => {
                    let _ = write!(out, "{:02x} ", byte);
                }
                None => out.push_str("   "),
            }
            if i == 7 {
                out.push(' ');
            }
        }
        out.push_str(" |");
        out.extend(chunk.iter().map(|&b| {
            if (0x20..=0x7e).contains(&b) {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layers;

    #[test]
    fn test_unset_and_empty_are_equivalent_for_matching() {
        let unset = Payload::default();
        let empty = Payload::new(Vec::new());
        let data = Payload::new(vec![1, 2, 3]);

        assert!(unset.matches(&empty));
        assert!(empty.matches(&unset));
        assert!(!unset.matches(&data));
        assert!(!data.matches(&empty));
        assert!(data.matches(&Payload::new(vec![1, 2, 3])));
    }

    #[test]
    fn test_merge_only_overrides_when_set() {
        let mut payload = Payload::new(b"foo".to_vec());
        payload.merge_from(&Payload::default());
        assert_eq!(payload.data(), b"foo");

        payload.merge_from(&Payload::new(Vec::new()));
        assert_eq!(payload.bytes, Some(Vec::new()));
    }

    #[test]
    fn test_payload_display() {
        let payload = Payload::new(b"Hooray for packet library!".to_vec());
        assert_eq!(
            payload.to_string(),
            "Payload{Bytes:\n\
             00000000  48 6f 6f 72 61 79 20 66  6f 72 20 70 61 63 6b 65  |Hooray for packe|\n\
             00000010  74 20 6c 69 62 72 61 72  79 21                    |t library!|\n\
             }"
        );
        assert_eq!(Payload::default().to_string(), "Payload{}");
    }

    #[test]
    fn test_hex_dump_half_line() {
        assert_eq!(
            hex_dump(b"abcdefg."),
            "00000000  61 62 63 64 65 66 67 2e                           |abcdefg.|\n"
        );
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn test_mismatched_fields_render() {
        let rows = Payload::default().mismatched_fields(&Payload::new(b"foo".to_vec()));
        assert_eq!(rows, vec![("Bytes", String::new(), "[102 111 111]".to_string())]);

        let rows = Payload::new(Vec::new()).mismatched_fields(&Payload::new(vec![1]));
        assert_eq!(rows, vec![("Bytes", String::new(), "[1]".to_string())]);

        let rows = Payload::new(vec![7]).mismatched_fields(&Payload::new(Vec::new()));
        assert_eq!(rows, vec![("Bytes", "[7]".to_string(), String::new())]);
    }

    #[test]
    fn test_empty_payload_diff_row_is_blank() {
        let empty = Layers::new().with(Payload::new(Vec::new()));
        let full = Layers::new().with(Payload::new(b"foo".to_vec()));
        assert_eq!(empty.diff(&full), "Payload: Bytes:  [102 111 111]\n");
    }
}
