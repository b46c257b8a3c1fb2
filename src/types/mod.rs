//! Types that are used across multiple components of the control plane.
//!
//! Other types, specific to single components, can be found in the "types" submodules of those
//! components, e.g., [`crate::controller::types`].

pub mod data_types;
