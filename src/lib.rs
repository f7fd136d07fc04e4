//! Edit the text metadata of PNG files without touching the image data.
//!
//! The file is read as a chunk container ([`png::reader`]), edited in
//! memory ([`png::edit`]) and written back with fresh crcs
//! ([`png::builder`]).

pub mod cli;
pub mod config;
pub mod hash;
pub mod png;
pub mod process;
