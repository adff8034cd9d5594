//! Error type of the engine.
//!
//! Only rule construction can fail; stepping and cell access are infallible.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{which} mask {mask:#x} has bits outside of neighbour counts 0..=8")]
    InvalidRuleMask { which: &'static str, mask: u32 },

    #[error("birth on 0 neighbours cannot be simulated on an unbounded empty plane")]
    UnsupportedBirthOnZero,

    #[error("invalid rule notation: {0:?}")]
    InvalidRuleString(String),
}
