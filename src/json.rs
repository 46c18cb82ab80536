//! # JSON Codec
//!
//! Translates between arena subtrees and JSON text, on top of `serde_json`.
//!
//! Mapping rules:
//!
//! - Null/Bool/Int64/Float64/String map to their JSON forms.
//! - Bytes round-trip through lowercase hex strings. On parse, every string
//!   that is valid hex (even length, all `[0-9a-fA-F]`) decodes as Bytes;
//!   anything else becomes String.
//! - Numbers that fit an i64 parse as Int64, the rest as Float64.
//! - The document root must be an object or array.

use std::time::Duration;

use eyre::{bail, ensure, eyre, Result};
use serde_json::{Map, Number, Value};

use crate::arena::{Arena, Type};
use crate::config::ROOT_OFFSET;
use crate::encoding::hex;
use crate::observability::{log_if_enabled, LogLevel, OpTimer};

/// Encodes the subtree rooted at the node offset `ofs` as JSON text.
pub fn to_json(arena: &Arena, ofs: usize) -> Result<String> {
    let _timer = OpTimer::new("json_serialize");
    log_if_enabled(
        LogLevel::Debug,
        "JSON serialize started",
        "json_serialize",
        Duration::ZERO,
        ofs,
        "",
    );
    let value = encode_value(arena, ofs)?;
    serde_json::to_string(&value).map_err(|e| eyre!("failed to serialize JSON: {}", e))
}

/// Parses JSON text into a fresh arena.
pub fn from_json(text: &str) -> Result<Arena> {
    let _timer = OpTimer::new("json_parse");
    log_if_enabled(
        LogLevel::Debug,
        "JSON parse started",
        "json_parse",
        Duration::ZERO,
        0,
        "",
    );
    let value: Value =
        serde_json::from_str(text).map_err(|e| eyre!("invalid JSON document: {}", e))?;

    let mut arena = Arena::new();
    match &value {
        Value::Object(map) => {
            arena.init_object()?;
            for (key, member) in map {
                insert_keyed(&mut arena, ROOT_OFFSET, key, member)?;
            }
        }
        Value::Array(items) => {
            arena.init_array()?;
            for item in items {
                append_element(&mut arena, ROOT_OFFSET, item)?;
            }
        }
        _ => bail!("invalid JSON document: root must be an object or array"),
    }
    Ok(arena)
}

/// `ofs` is a node offset for containers, or a value type-byte offset for
/// scalars; the first byte reads as the type tag either way.
fn encode_value(arena: &Arena, ofs: usize) -> Result<Value> {
    let data = arena.data();
    ensure!(ofs < data.len(), "value offset {} out of bounds", ofs);
    let ty = Type::from_byte(data[ofs])
        .ok_or_else(|| eyre!("corrupt value type tag at offset {}", ofs))?;

    Ok(match ty {
        Type::Null => Value::Null,
        Type::Bool => Value::Bool(arena.decode_bool(ofs)?),
        Type::Int64 => Value::Number(arena.decode_i64(ofs)?.into()),
        Type::Float64 => {
            let v = arena.decode_f64(ofs)?;
            Value::Number(
                Number::from_f64(v)
                    .ok_or_else(|| eyre!("non-finite float cannot be serialized as JSON"))?,
            )
        }
        Type::String => Value::String(arena.decode_str(ofs)?.to_string()),
        Type::Bytes => Value::String(hex::encode(arena.decode_bytes(ofs)?)),
        Type::Object => {
            let mut map = Map::new();
            for entry in arena.entries(ofs) {
                let entry = entry?;
                let member_ofs = if entry.value_type.is_container() {
                    entry.value_offset + 1
                } else {
                    entry.value_offset
                };
                map.insert(entry.key.to_string(), encode_value(arena, member_ofs)?);
            }
            Value::Object(map)
        }
        Type::Array => {
            let len = arena.arr_len(ofs)?;
            let mut items = Vec::with_capacity(len as usize);
            for index in 0..len {
                let (element_ty, value_ofs) = arena.arr_entry(ofs, index)?;
                let element_ofs = if element_ty.is_container() {
                    value_ofs + 1
                } else {
                    value_ofs
                };
                items.push(encode_value(arena, element_ofs)?);
            }
            Value::Array(items)
        }
    })
}

fn insert_keyed(arena: &mut Arena, ofs: usize, key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null => arena.set_null(ofs, key),
        Value::Bool(b) => arena.set_bool(ofs, key, *b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => arena.set_i64(ofs, key, i),
            None => arena.set_f64(ofs, key, number_as_f64(n)?),
        },
        Value::String(s) => match hex::try_decode(s) {
            Some(bytes) => arena.set_bytes(ofs, key, &bytes),
            None => arena.set_str(ofs, key, s),
        },
        Value::Array(items) => {
            let nested = arena.set_arr(ofs, key)?;
            for item in items {
                append_element(arena, nested, item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            let nested = arena.set_obj(ofs, key)?;
            for (member_key, member) in map {
                insert_keyed(arena, nested, member_key, member)?;
            }
            Ok(())
        }
    }
}

fn append_element(arena: &mut Arena, ofs: usize, value: &Value) -> Result<()> {
    match value {
        Value::Null => arena.arr_append_null(ofs),
        Value::Bool(b) => arena.arr_append_bool(ofs, *b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => arena.arr_append_i64(ofs, i),
            None => arena.arr_append_f64(ofs, number_as_f64(n)?),
        },
        Value::String(s) => match hex::try_decode(s) {
            Some(bytes) => arena.arr_append_bytes(ofs, &bytes),
            None => arena.arr_append_str(ofs, s),
        },
        Value::Array(items) => {
            let nested = arena.arr_append_arr(ofs)?;
            for item in items {
                append_element(arena, nested, item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            let nested = arena.arr_append_obj(ofs)?;
            for (member_key, member) in map {
                insert_keyed(arena, nested, member_key, member)?;
            }
            Ok(())
        }
    }
}

fn number_as_f64(n: &Number) -> Result<f64> {
    n.as_f64()
        .ok_or_else(|| eyre!("unrepresentable JSON number: {}", n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_roundtrip_preserves_values() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena.set_str(ROOT_OFFSET, "name", "ada").unwrap();
        arena.set_i64(ROOT_OFFSET, "id", 100).unwrap();
        arena.set_bool(ROOT_OFFSET, "active", true).unwrap();
        arena.set_f64(ROOT_OFFSET, "ratio", 0.5).unwrap();
        arena.set_null(ROOT_OFFSET, "missing").unwrap();

        let text = to_json(&arena, ROOT_OFFSET).unwrap();
        let parsed = from_json(&text).unwrap();

        assert_eq!(parsed.get_str(ROOT_OFFSET, "name").unwrap(), "ada");
        assert_eq!(parsed.get_i64(ROOT_OFFSET, "id").unwrap(), 100);
        assert!(parsed.get_bool(ROOT_OFFSET, "active").unwrap());
        assert_eq!(parsed.get_f64(ROOT_OFFSET, "ratio").unwrap(), 0.5);
        assert_eq!(parsed.get_type(ROOT_OFFSET, "missing").unwrap(), Type::Null);
    }

    #[test]
    fn nested_containers_roundtrip() {
        let text = r#"{"user":{"name":"grace","tags":["zz","yy"],"meta":{"depth":3}}}"#;
        let arena = from_json(text).unwrap();

        let user = arena.get_obj(ROOT_OFFSET, "user").unwrap();
        assert_eq!(arena.get_str(user, "name").unwrap(), "grace");
        let tags = arena.get_arr(user, "tags").unwrap();
        assert_eq!(arena.arr_get_str(tags, 0).unwrap(), "zz");
        assert_eq!(arena.arr_get_str(tags, 1).unwrap(), "yy");
        let meta = arena.get_obj(user, "meta").unwrap();
        assert_eq!(arena.get_i64(meta, "depth").unwrap(), 3);

        let reencoded = to_json(&arena, ROOT_OFFSET).unwrap();
        let reparsed = from_json(&reencoded).unwrap();
        let user = reparsed.get_obj(ROOT_OFFSET, "user").unwrap();
        assert_eq!(reparsed.get_str(user, "name").unwrap(), "grace");
    }

    #[test]
    fn bytes_roundtrip_as_lowercase_hex() {
        let mut arena = Arena::new();
        arena.init_object().unwrap();
        arena
            .set_bytes(ROOT_OFFSET, "blob", &[0xDE, 0xAD, 0xBE, 0xEF])
            .unwrap();

        let text = to_json(&arena, ROOT_OFFSET).unwrap();
        assert!(text.contains("\"deadbeef\""));

        let parsed = from_json(&text).unwrap();
        assert_eq!(
            parsed.get_bytes(ROOT_OFFSET, "blob").unwrap(),
            &[0xDE, 0xAD, 0xBE, 0xEF]
        );
    }

    #[test]
    fn hex_looking_strings_parse_as_bytes() {
        let arena = from_json(r#"{"a":"cafe","b":"caf","c":"hello!"}"#).unwrap();

        assert_eq!(arena.get_type(ROOT_OFFSET, "a").unwrap(), Type::Bytes);
        assert_eq!(arena.get_bytes(ROOT_OFFSET, "a").unwrap(), &[0xCA, 0xFE]);
        assert_eq!(arena.get_type(ROOT_OFFSET, "b").unwrap(), Type::String);
        assert_eq!(arena.get_type(ROOT_OFFSET, "c").unwrap(), Type::String);
    }

    #[test]
    fn array_root_roundtrip() {
        let arena = from_json(r#"[1, "two", 2.5, null, true, [3]]"#).unwrap();

        assert_eq!(arena.arr_len(ROOT_OFFSET).unwrap(), 6);
        assert_eq!(arena.arr_get_i64(ROOT_OFFSET, 0).unwrap(), 1);
        assert_eq!(arena.arr_get_str(ROOT_OFFSET, 1).unwrap(), "two");
        assert_eq!(arena.arr_get_f64(ROOT_OFFSET, 2).unwrap(), 2.5);
        assert_eq!(arena.arr_get_type(ROOT_OFFSET, 3).unwrap(), Type::Null);
        assert!(arena.arr_get_bool(ROOT_OFFSET, 4).unwrap());
        let inner = arena.arr_get_arr(ROOT_OFFSET, 5).unwrap();
        assert_eq!(arena.arr_get_i64(inner, 0).unwrap(), 3);

        let text = to_json(&arena, ROOT_OFFSET).unwrap();
        assert_eq!(text, r#"[1,"two",2.5,null,true,[3]]"#);
    }

    #[test]
    fn scalar_root_is_rejected() {
        let err = from_json("42").unwrap_err();
        assert!(err.to_string().contains("object or array"));
    }

    #[test]
    fn malformed_text_is_rejected() {
        let err = from_json("{not json").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn large_numbers_fall_back_to_float() {
        let arena = from_json(r#"{"big": 18446744073709551615}"#).unwrap();
        assert_eq!(arena.get_type(ROOT_OFFSET, "big").unwrap(), Type::Float64);
    }

    #[test]
    fn subtree_serialization() {
        let arena = from_json(r#"{"outer":1,"inner":{"x":"y"}}"#).unwrap();
        let inner = arena.get_obj(ROOT_OFFSET, "inner").unwrap();

        assert_eq!(to_json(&arena, inner).unwrap(), r#"{"x":"y"}"#);
    }
}
