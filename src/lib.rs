//! eLCA: life cycle assessment of building models
//!
//! Model files describe projects, process libraries and building variants.
//! Variants are computed into an SQLite result cache whose item tree is
//! re-aggregated incrementally when parts of it become outdated.

pub mod cli;
pub mod core;
pub mod lca;
pub mod model;
pub mod processing;
pub mod yaml;
