//! Repack H2 emission cube JSON documents into MessagePack.
//!
//! The JSON file carries a `wavelengths` axis and a nested `fluxes` array;
//! the output file holds the `fluxes` value alone (or, on request, both
//! fields) as one MessagePack value.

pub mod convert;
pub mod data;
pub mod error;

pub use convert::{convert, convert_with, verify, ConvertOptions, ConvertReport};
pub use data::model::{CubeShape, EmissionCube, PayloadLayout};
pub use error::ConvertError;
