use std::io::{Cursor, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tempfile::NamedTempFile;

use crate::error::{ConvertError, ErrContext};

// ---------------------------------------------------------------------------
// MessagePack codec
// ---------------------------------------------------------------------------

/// Encode a payload as a single MessagePack value.
///
/// Integers take the smallest msgpack int encoding, floats are always
/// float64 and map keys keep their source order. Text goes out in the `str`
/// family; `bin` is reserved for byte blobs.
pub fn encode_payload(payload: &JsonValue) -> Result<Vec<u8>, ConvertError> {
    let mut bytes = Vec::new();
    payload.serialize(&mut rmp_serde::Serializer::new(&mut bytes))?;
    Ok(bytes)
}

/// Decode a single MessagePack value back into a JSON value.
///
/// `bytes` must hold exactly one value; anything left over after it is an
/// error.
pub fn decode_payload(bytes: &[u8]) -> Result<JsonValue, ConvertError> {
    let mut cursor = Cursor::new(bytes);
    let value = JsonValue::deserialize(&mut rmp_serde::Deserializer::new(&mut cursor))?;

    let extra = bytes.len() - cursor.position() as usize;
    if extra > 0 {
        return Err(ConvertError::TrailingBytes { extra });
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Output file
// ---------------------------------------------------------------------------

/// Write `bytes` to `path`, creating or truncating it.
///
/// With `atomic` the bytes go to a temporary file next to `path` which is
/// renamed over it once fully written, so readers never see a partial file.
/// Without it an interrupted write can leave `path` empty or truncated.
pub fn write_payload(path: &Path, bytes: &[u8], atomic: bool) -> Result<(), ConvertError> {
    if atomic {
        write_atomic(path, bytes)
    } else {
        std::fs::write(path, bytes).context(format!("writing {}", path.display()))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)
        .context(format!("creating temporary file in {}", dir.display()))?;
    log::debug!("Staging output in {}", file.path().display());

    file.write_all(bytes)
        .context(format!("writing {}", file.path().display()))?;
    file.as_file()
        .sync_all()
        .context(format!("syncing {}", file.path().display()))?;

    file.persist(path)
        .map_err(|err| err.error)
        .context(format!("renaming temporary file to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_floats_survive_encoding() {
        let fluxes = json!([[1.5, -2.0], [0.0, 3.25]]);
        let bytes = encode_payload(&fluxes).unwrap();
        assert_eq!(decode_payload(&bytes).unwrap(), fluxes);
    }

    #[test]
    fn floats_are_written_as_float64() {
        let bytes = encode_payload(&json!([1.5])).unwrap();
        // fixarray(1), float64 marker, big-endian IEEE 754
        let mut expected = vec![0x91, 0xcb];
        expected.extend_from_slice(&1.5f64.to_be_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn small_ints_and_text_use_compact_markers() {
        let bytes = encode_payload(&json!([1, -1, "a", null, true])).unwrap();
        assert_eq!(bytes, [0x95, 0x01, 0xff, 0xa1, b'a', 0xc0, 0xc3]);
    }

    #[test]
    fn empty_array_is_a_single_byte() {
        assert_eq!(encode_payload(&json!([])).unwrap(), [0x90]);
    }

    #[test]
    fn maps_keep_key_order() {
        let payload = json!({"z": 1, "a": 2});
        let bytes = encode_payload(&payload).unwrap();
        assert_eq!(bytes, [0x82, 0xa1, b'z', 0x01, 0xa1, b'a', 0x02]);
    }

    #[test]
    fn garbage_does_not_decode() {
        let err = decode_payload(&[0xc1]).unwrap_err();
        assert!(matches!(err, ConvertError::Decode(_)), "{err:?}");
    }

    #[test]
    fn bytes_after_the_value_are_rejected() {
        let mut bytes = encode_payload(&json!([1.0])).unwrap();
        bytes.extend_from_slice(b"GARBAGE");
        let err = decode_payload(&bytes).unwrap_err();
        assert!(matches!(err, ConvertError::TrailingBytes { extra: 7 }), "{err:?}");
    }

    #[test]
    fn a_second_value_is_rejected() {
        let err = decode_payload(&[0x90, 0x90]).unwrap_err();
        assert!(matches!(err, ConvertError::TrailingBytes { extra: 1 }), "{err:?}");
    }

    #[test]
    fn atomic_write_replaces_file_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.msgpack");
        std::fs::write(&path, b"old contents").unwrap();

        write_payload(&path, &[0x90], true).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), [0x90]);
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn unwritable_destination_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.msgpack");
        for atomic in [false, true] {
            let err = write_payload(&path, &[0x90], atomic).unwrap_err();
            assert!(matches!(err, ConvertError::Io { .. }), "{err:?}");
        }
    }
}
