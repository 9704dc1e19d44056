//! Fork resolution across peers

pub mod resolver;

pub use resolver::{select_best, ResolveOutcome, Resolver};
