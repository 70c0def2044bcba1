//! Command modules - one file per CLI command

pub mod inject;
