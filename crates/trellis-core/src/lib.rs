//! Core library for trellis: plan acquisition and validation, path safety,
//! conflict resolution, and materialization of scaffolds onto disk.

pub mod backend;
pub mod conflict;
pub mod materialize;
pub mod plan;
