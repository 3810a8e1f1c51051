mod filename;
mod patterns;

pub use filename::{MediaCandidate, Parser, split_extension};
