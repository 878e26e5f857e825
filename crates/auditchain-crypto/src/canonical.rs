//! Canonical JSON encoding for digest input.
//!
//! Object keys are emitted in sorted order, separators are `", "` and `": "`,
//! and every character outside printable ASCII is written as a `\uXXXX`
//! escape. The output is byte-identical to the sorted-key, ASCII-only JSON
//! that existing ledger files were hashed over, so chains written before this
//! crate existed still verify.
//!
//! Known divergence: floats with an exponent (`1e20`) render without the
//! explicit `+` sign. Audit payloads carry amounts as strings, so this does
//! not arise in practice.

use std::io::{self, Write};

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::ser::Formatter;
use serde_json::Value;

/// Encode a JSON value canonically.
pub fn to_canonical_vec(value: &Value) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    Sorted(value).serialize(&mut ser)?;
    Ok(out)
}

/// Encode a JSON value canonically as a `String`.
pub fn to_canonical_string(value: &Value) -> serde_json::Result<String> {
    let bytes = to_canonical_vec(value)?;
    // Every non-ASCII char is escaped, so the output is plain ASCII.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Serializes a [`Value`] with object keys in sorted order, regardless of
/// whether `serde_json` was built with `preserve_order`.
struct Sorted<'a>(&'a Value);

impl Serialize for Sorted<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort_unstable();
                let mut out = serializer.serialize_map(Some(keys.len()))?;
                for key in keys {
                    out.serialize_entry(key, &Sorted(&map[key]))?;
                }
                out.end()
            }
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(&Sorted(item))?;
                }
                out.end()
            }
            scalar => scalar.serialize(serializer),
        }
    }
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (at, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\u{7f}' {
                continue;
            }
            writer.write_all(fragment[start..at].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = at + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_with_spaced_separators() {
        let value = json!({"user": "alice", "action": "login", "n": [1, 2]});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"action": "login", "n": [1, 2], "user": "alice"}"#
        );
    }

    #[test]
    fn nested_objects_are_sorted() {
        let value = json!({"b": {"z": 1, "a": null}, "a": [{"y": true, "x": false}]});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"a": [{"x": false, "y": true}], "b": {"a": null, "z": 1}}"#
        );
    }

    #[test]
    fn non_ascii_is_escaped() {
        let value = json!({"name": "café ☕", "emoji": "😀"});
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#"{"emoji": "\ud83d\ude00", "name": "caf\u00e9 \u2615"}"#
        );
    }

    #[test]
    fn control_characters_are_escaped() {
        let value = json!("tab\there\u{1}\u{7f}");
        assert_eq!(
            to_canonical_string(&value).unwrap(),
            r#""tab\there\u0001\u007f""#
        );
    }

    #[test]
    fn bare_string_payload() {
        let value = json!("Genesis Block");
        assert_eq!(to_canonical_string(&value).unwrap(), r#""Genesis Block""#);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(to_canonical_string(&json!({})).unwrap(), "{}");
        assert_eq!(to_canonical_string(&json!([])).unwrap(), "[]");
    }

    proptest! {
        #[test]
        fn insertion_order_does_not_matter(
            pairs in proptest::collection::vec(("[a-z]{1,6}", any::<i64>()), 0..12)
        ) {
            let mut forward = serde_json::Map::new();
            for (k, v) in &pairs {
                forward.insert(k.clone(), json!(v));
            }
            let mut backward = serde_json::Map::new();
            for (k, _) in pairs.iter().rev() {
                backward.insert(k.clone(), forward[k].clone());
            }
            prop_assert_eq!(
                to_canonical_vec(&Value::Object(forward)).unwrap(),
                to_canonical_vec(&Value::Object(backward)).unwrap()
            );
        }

        #[test]
        fn output_is_always_ascii(s in "\\PC{0,24}") {
            let encoded = to_canonical_vec(&json!({ "k": s })).unwrap();
            prop_assert!(encoded.is_ascii());
        }
    }
}
