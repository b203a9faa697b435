/// Data layer: cube model, loading and writing.
///
/// Architecture:
/// ```text
///  h2_emission_cube.json
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → EmissionCube
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ EmissionCube │  wavelengths + fluxes → payload Value
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer  │  payload → MessagePack → .msgpack file
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod writer;
