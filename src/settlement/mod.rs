//! Turning balances into "who pays whom how much".

pub mod solver;
