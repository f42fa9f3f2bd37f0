//! Control laws. Both are pure functions of their inputs and the previous state.

pub mod cascade;
pub mod pid;
