//! Application lifecycle: the transition table and the executor that enforces it.

mod executor;
mod registry;

pub use executor::{
    TransitionError, TransitionExecutor, TransitionMode, TransitionRecord,
    FORCE_TRANSITION_ACTION, ROUTED_TO_BANK_EVENT,
};
pub use registry::{StatusEntry, StatusRegistry};
