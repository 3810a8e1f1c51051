//! Rename movie and TV episode files to a canonical layout using metadata
//! from TMDB.
//!
//! A scan never touches the filesystem: it produces a [`renamer::ScanSession`]
//! of proposed renames that can be reviewed, exported as JSON and applied
//! later with [`renamer::Executor`].

pub mod cli;
pub mod credentials;
pub mod logging;
pub mod renamer;
pub mod scraper;
pub mod settings;
