use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::value::RawValue;
use serde_json::Value as JsonValue;

use super::model::EmissionCube;
use crate::error::{ConvertError, ErrContext};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an emission cube from a JSON file.
///
/// Expected schema:
///
/// ```json
/// {
///   "wavelengths": [1000.0, 1000.5, ...],
///   "fluxes": [[[0.12, 0.14, ...], ...], ...],
///   "...": "other keys are ignored"
/// }
/// ```
pub fn load_cube(path: &Path) -> Result<EmissionCube, ConvertError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ConvertError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(err) => return Err(err).context(format!("reading {}", path.display())),
    };
    log::debug!("Read {} bytes from {}", bytes.len(), path.display());

    parse_cube(&bytes, path)
}

/// Parse an in-memory JSON document. `path` is only used in errors.
pub fn parse_cube(bytes: &[u8], path: &Path) -> Result<EmissionCube, ConvertError> {
    let root: JsonValue = serde_json::from_slice(bytes).map_err(|source| ConvertError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let JsonValue::Object(mut obj) = root else {
        // A document that is not a map cannot hold either key.
        return Err(ConvertError::Schema {
            path: path.to_path_buf(),
            key: "fluxes",
        });
    };

    let mut take = |key: &'static str| {
        obj.remove(key).ok_or_else(|| ConvertError::Schema {
            path: path.to_path_buf(),
            key,
        })
    };
    let wavelengths = take("wavelengths")?;
    let fluxes = take("fluxes")?;

    // serde_json reads integers beyond 64 bits as f64. Find them in the
    // source text; the rare hit pays for a second pass to attribute it.
    let mut oversized = Vec::new();
    if oversized_integer(bytes).is_some() {
        let fields: BTreeMap<String, &RawValue> =
            serde_json::from_slice(bytes).map_err(|source| ConvertError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        for key in ["wavelengths", "fluxes"] {
            let literal = fields
                .get(key)
                .and_then(|raw| oversized_integer(raw.get().as_bytes()));
            if let Some(literal) = literal {
                log::debug!("'{key}' holds out-of-range integer {literal}");
                oversized.push((key, literal));
            }
        }
    }

    Ok(EmissionCube {
        wavelengths,
        fluxes,
        oversized,
    })
}

/// First integer literal in `json` that fits neither `i64` nor `u64`.
/// Literals with a fraction or exponent are floats and never match.
fn oversized_integer(json: &[u8]) -> Option<String> {
    let mut i = 0;
    while i < json.len() {
        match json[i] {
            b'"' => {
                i += 1;
                while i < json.len() && json[i] != b'"' {
                    if json[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'-' | b'0'..=b'9' => {
                let start = i;
                i += 1;
                while i < json.len()
                    && matches!(json[i], b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-')
                {
                    i += 1;
                }
                let literal = String::from_utf8_lossy(&json[start..i]);
                let integral = !literal.contains(|c: char| matches!(c, '.' | 'e' | 'E'));
                if integral && literal.parse::<i64>().is_err() && literal.parse::<u64>().is_err() {
                    return Some(literal.into_owned());
                }
            }
            _ => i += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> Result<EmissionCube, ConvertError> {
        parse_cube(text.as_bytes(), Path::new("cube.json"))
    }

    #[test]
    fn extra_keys_are_ignored() {
        let cube = parse(r#"{"wavelengths": [1.0], "fluxes": [2.0], "units": "erg/s"}"#).unwrap();
        assert_eq!(cube.wavelengths, json!([1.0]));
        assert_eq!(cube.fluxes, json!([2.0]));
    }

    #[test]
    fn truncated_document_is_a_parse_error() {
        let err = parse(r#"{"flux"#).unwrap_err();
        assert!(matches!(err, ConvertError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = parse_cube(b"{\"fluxes\": \"\xff\"}", Path::new("cube.json")).unwrap_err();
        assert!(matches!(err, ConvertError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn missing_keys_are_schema_errors() {
        let err = parse(r#"{"wavelengths": [1.0]}"#).unwrap_err();
        assert!(matches!(err, ConvertError::Schema { key: "fluxes", .. }), "{err:?}");

        let err = parse(r#"{"fluxes": [1.0]}"#).unwrap_err();
        assert!(matches!(err, ConvertError::Schema { key: "wavelengths", .. }), "{err:?}");
    }

    #[test]
    fn non_object_root_is_a_schema_error() {
        let err = parse("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ConvertError::Schema { .. }), "{err:?}");
    }

    #[test]
    fn null_fluxes_are_accepted() {
        let cube = parse(r#"{"wavelengths": [], "fluxes": null}"#).unwrap();
        assert_eq!(cube.fluxes, JsonValue::Null);
    }

    #[test]
    fn integers_beyond_64_bits_are_flagged_per_key() {
        let cube = parse(r#"{"wavelengths": [1], "fluxes": [18446744073709551616, 1.5]}"#).unwrap();
        assert_eq!(cube.oversized, [("fluxes", "18446744073709551616".to_string())]);

        let cube = parse(r#"{"wavelengths": [-9223372036854775809], "fluxes": []}"#).unwrap();
        assert_eq!(cube.oversized, [("wavelengths", "-9223372036854775809".to_string())]);
    }

    #[test]
    fn integers_at_the_64_bit_limits_are_fine() {
        let text = r#"{"wavelengths": [], "fluxes": [18446744073709551615, -9223372036854775808]}"#;
        assert!(parse(text).unwrap().oversized.is_empty());
    }

    #[test]
    fn big_literals_elsewhere_are_ignored() {
        let text = r#"{"id": 99999999999999999999, "note": "123456789012345678901234",
                       "wavelengths": [1e300], "fluxes": [1.0e25, 12345678901234567890123.0]}"#;
        assert!(parse(text).unwrap().oversized.is_empty());
    }

    #[test]
    fn escaped_quotes_do_not_confuse_the_scan() {
        assert_eq!(oversized_integer(br#"["a\"99999999999999999999", 1]"#), None);
        assert_eq!(
            oversized_integer(br#"["\\", 99999999999999999999]"#).as_deref(),
            Some("99999999999999999999")
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_cube(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConvertError::NotFound { .. }), "{err:?}");
    }
}
