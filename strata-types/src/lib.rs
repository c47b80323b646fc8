//! Shared types for strata
//!
//! This crate provides the two data shapes every other strata crate works
//! with: the state tree ([`Value`]) and the deep-partial update describing
//! a change to it ([`Patch`]).

pub mod patch;
pub mod value;

pub use patch::{ElementAction, ElementEdit, Patch};
pub use value::{Record, Value};
