//! Editions and version ranges
//!
//! An edition is the `[epoch:]version[-release]` triple attached to every
//! resolvable. Editions are ordered with rpm segment comparison, and a
//! [`Range`] pairs an edition with a [`Rel`] operator to express what a
//! capability accepts.

mod edition;
mod range;
mod rel;

pub use edition::{compare_segments, Edition, EditionError};
pub use range::Range;
pub use rel::Rel;
