//! The stateful workflows behind the thin request handlers: challenge
//! completion with its one-shot points award, community goal contribution
//! with threshold congratulations, and heuristic recommendation generation.

pub mod challenges;
pub mod goals;
pub mod recommendations;
