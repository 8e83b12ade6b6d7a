//! Optional header fields
//!
//! Every header field of a [`Layer`](crate::Layer) is an `Option`. `None`
//! means "unspecified": it matches any value and is filled in with a computed
//! or default value on serialization. `Some(0)` is an explicit zero and
//! matches only zero.

use crate::ethernet::MacAddress;
use std::net::Ipv4Addr;

/// A value that can sit in a header field
pub trait FieldValue: Clone + PartialEq {
    /// Render the value the way layer dumps and diffs show it
    fn render(&self) -> String;
}

impl FieldValue for u8 {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for u16 {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for u32 {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for Ipv4Addr {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for MacAddress {
    fn render(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for Vec<u8> {
    fn render(&self) -> String {
        render_bytes(self)
    }
}

/// Render bytes as a decimal list, e.g. `[102 111 111]`
pub fn render_bytes(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(|b| b.to_string()).collect();
    format!("[{}]", items.join(" "))
}

/// Wildcard comparison: an unset side matches anything
pub fn field_matches<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Overlay `src` onto `dst` when `src` is set
pub fn merge_field<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if let Some(value) = src {
        *dst = Some(value.clone());
    }
}

/// One row of a field-level diff: label, left value, right value
pub(crate) type FieldRow = (&'static str, String, String);

/// Implements matching, merging and field listing for a layer record whose
/// fields are all `Option<impl FieldValue>`.
macro_rules! layer_fields {
    ($ty:ident, $name:literal, { $($field:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            /// Layer name used in dumps and diffs
            pub const NAME: &'static str = $name;

            /// Field-wise wildcard match
            pub fn matches(&self, other: &Self) -> bool {
                $($crate::field::field_matches(&self.$field, &other.$field))&&+
            }

            /// Overlay every field set in `other`
            pub fn merge_from(&mut self, other: &Self) {
                $($crate::field::merge_field(&mut self.$field, &other.$field);)+
            }

            /// Labels and rendered values of the fields that are set
            pub fn set_fields(&self) -> Vec<(&'static str, String)> {
                let mut out = Vec::new();
                $(
                    if let Some(value) = &self.$field {
                        out.push(($label, $crate::field::FieldValue::render(value)));
                    }
                )+
                out
            }

            pub(crate) fn mismatched_fields(&self, other: &Self) -> Vec<$crate::field::FieldRow> {
                let mut out = Vec::new();
                $(
                    if let (Some(a), Some(b)) = (&self.$field, &other.$field) {
                        if a != b {
                            out.push((
                                $label,
                                $crate::field::FieldValue::render(a),
                                $crate::field::FieldValue::render(b),
                            ));
                        }
                    }
                )+
                out
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let fields: Vec<String> = self
                    .set_fields()
                    .into_iter()
                    .map(|(label, value)| format!("{}:{}", label, value))
                    .collect();
                write!(f, "{}{{{}}}", Self::NAME, fields.join(" "))
            }
        }
    };
}

pub(crate) use layer_fields;
