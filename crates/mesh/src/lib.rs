//! Mesh representations for the Terracotta sculpting system.
//!
//! A sculpted object's surface is stored in one of three incompatible forms:
//! - [`polygon::PolyMesh`] - an indexed polygon mesh with attribute-backed
//!   visibility flags
//! - [`grids::SubdivGrids`] - multiresolution subdivision grids with one
//!   hidden bit per sample
//! - [`dyntopo::DynTopoMesh`] - a dynamic topology triangle mesh with native
//!   per-element hidden flags
//!
//! The `visibility` crate builds its hide/show engine on top of these.

pub mod attributes;
pub mod bits;
pub mod dyntopo;
pub mod grids;
pub mod polygon;

pub use attributes::*;
pub use bits::*;
pub use dyntopo::*;
pub use grids::*;
pub use polygon::*;
