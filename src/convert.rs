use std::path::Path;

use crate::data::loader::load_cube;
use crate::data::model::{CubeShape, PayloadLayout};
use crate::data::writer::{decode_payload, encode_payload, write_payload};
use crate::error::{ConvertError, ErrContext};

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

/// Knobs for [`convert_with`]. The default writes the bare `fluxes` value
/// straight to the destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    pub layout: PayloadLayout,
    /// Stage the output in a temp file and rename it into place.
    pub atomic: bool,
}

/// What a conversion produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertReport {
    /// Length of the source wavelength axis.
    pub wavelengths: usize,
    /// Shape of the flux array, `None` if ragged or non-numeric.
    pub shape: Option<CubeShape>,
    /// Size of the encoded output.
    pub bytes: usize,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Convert the emission cube at `source` into a MessagePack file at `dest`
/// holding only its `fluxes` value.
pub fn convert(source: &Path, dest: &Path) -> Result<(), ConvertError> {
    convert_with(source, dest, &ConvertOptions::default()).map(|_| ())
}

/// Convert with explicit options.
///
/// The source is fully loaded and encoded before `dest` is opened, so a
/// failure to read, parse or encode never creates or touches `dest`.
/// Integers beyond the 64-bit range in the written fields fail with
/// [`ConvertError::IntegerOverflow`].
pub fn convert_with(
    source: &Path,
    dest: &Path,
    options: &ConvertOptions,
) -> Result<ConvertReport, ConvertError> {
    let cube = load_cube(source)?;
    let wavelengths = cube.wavelength_count();
    let shape = cube.flux_shape();
    cube.check_encodable(options.layout)?;

    let payload = cube.into_payload(options.layout);
    let bytes = encode_payload(&payload)?;
    write_payload(dest, &bytes, options.atomic)?;

    match &shape {
        Some(shape) => log::info!(
            "Packed fluxes ({shape}) into {} ({} bytes)",
            dest.display(),
            bytes.len()
        ),
        None => log::info!(
            "Packed non-rectangular fluxes into {} ({} bytes)",
            dest.display(),
            bytes.len()
        ),
    }
    if options.layout == PayloadLayout::FluxesOnly && wavelengths > 0 {
        log::debug!("Dropped {wavelengths} wavelengths from the output");
    }

    Ok(ConvertReport {
        wavelengths,
        shape,
        bytes: bytes.len(),
    })
}

/// Check that `dest` decodes to the payload `source` would produce under
/// `layout`.
pub fn verify(source: &Path, dest: &Path, layout: PayloadLayout) -> Result<(), ConvertError> {
    let expected = load_cube(source)?.into_payload(layout);
    let bytes = std::fs::read(dest).context(format!("reading {}", dest.display()))?;
    let actual = decode_payload(&bytes)?;

    if actual != expected {
        return Err(ConvertError::Mismatch {
            path: dest.to_path_buf(),
        });
    }
    log::debug!("{} matches {}", dest.display(), source.display());
    Ok(())
}
