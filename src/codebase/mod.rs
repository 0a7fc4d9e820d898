//! Domain node models describing what to build.
//!
//! The types in this module are inert value objects: they carry identity via
//! structural equality, never via behavior, and are translated into build
//! targets by the processors registered on a [`crate::toolchain::Toolchain`].

pub mod c;
