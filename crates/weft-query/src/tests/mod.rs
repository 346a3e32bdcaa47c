//! Crate-level tests spanning several modules.

mod behaviour;
pub(crate) mod support;
