use std::fmt;

use serde_json::{Map, Value as JsonValue};

use crate::error::ConvertError;

// ---------------------------------------------------------------------------
// PayloadLayout – what ends up in the output file
// ---------------------------------------------------------------------------

/// Which part of the cube is written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadLayout {
    /// The bare `fluxes` value. Wavelengths are dropped.
    #[default]
    FluxesOnly,
    /// A map `{"wavelengths": ..., "fluxes": ...}`.
    Cube,
}

// ---------------------------------------------------------------------------
// EmissionCube – the source document
// ---------------------------------------------------------------------------

/// The two fields of an emission cube document we care about.
/// Any other top-level keys are discarded by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionCube {
    /// Wavelength axis, kept as the raw JSON value.
    pub wavelengths: JsonValue,
    /// Nested flux array, shape defined by whoever produced the file.
    pub fluxes: JsonValue,
    /// Fields whose source text holds an integer outside the 64-bit range,
    /// with the first such literal. Their values above carry it as an f64.
    pub oversized: Vec<(&'static str, String)>,
}

impl EmissionCube {
    /// Number of entries on the wavelength axis, 0 if it is not an array.
    pub fn wavelength_count(&self) -> usize {
        self.wavelengths.as_array().map_or(0, Vec::len)
    }

    /// Shape of the flux array, if it is rectangular.
    pub fn flux_shape(&self) -> Option<CubeShape> {
        CubeShape::of(&self.fluxes)
    }

    /// Fail if a field that `layout` writes out holds an integer MessagePack
    /// cannot represent.
    pub fn check_encodable(&self, layout: PayloadLayout) -> Result<(), ConvertError> {
        let written = |key: &str| match layout {
            PayloadLayout::FluxesOnly => key == "fluxes",
            PayloadLayout::Cube => true,
        };
        match self.oversized.iter().find(|(key, _)| written(*key)) {
            Some((key, literal)) => Err(ConvertError::IntegerOverflow {
                key: *key,
                literal: literal.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Consume the cube and build the value that gets encoded.
    pub fn into_payload(self, layout: PayloadLayout) -> JsonValue {
        match layout {
            PayloadLayout::FluxesOnly => self.fluxes,
            PayloadLayout::Cube => {
                let mut map = Map::with_capacity(2);
                map.insert("wavelengths".to_string(), self.wavelengths);
                map.insert("fluxes".to_string(), self.fluxes);
                JsonValue::Object(map)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CubeShape – dimensions of a rectangular numeric array
// ---------------------------------------------------------------------------

/// Dimensions of a nested numeric array, outermost first.
/// A bare number has an empty shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeShape(pub Vec<usize>);

impl CubeShape {
    /// Work out the shape of `value`.
    ///
    /// Returns `None` when the value holds anything other than numbers and
    /// arrays, or when sibling arrays disagree in shape (ragged data).
    pub fn of(value: &JsonValue) -> Option<CubeShape> {
        match value {
            JsonValue::Number(_) => Some(CubeShape(Vec::new())),
            JsonValue::Array(items) => {
                let mut inner: Option<CubeShape> = None;
                for item in items {
                    let shape = CubeShape::of(item)?;
                    match &inner {
                        Some(seen) if *seen != shape => return None,
                        Some(_) => {}
                        None => inner = Some(shape),
                    }
                }
                let mut dims = vec![items.len()];
                if let Some(CubeShape(rest)) = inner {
                    dims.extend(rest);
                }
                Some(CubeShape(dims))
            }
            _ => None,
        }
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of scalar elements.
    pub fn len(&self) -> usize {
        self.0.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for CubeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "scalar");
        }
        let dims: Vec<String> = self.0.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", dims.join(" x "))
    }
}
