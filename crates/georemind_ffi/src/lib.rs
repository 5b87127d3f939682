//! Flutter-facing FFI crate for GeoRemind core.

pub mod api;
