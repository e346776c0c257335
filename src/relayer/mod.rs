//! The relayer: everything to do with submitting settlement transactions
//! and reconciling their outcome.

pub mod settlement;
