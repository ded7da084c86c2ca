//! Storage layer for sampledb
//!
//! Reads and atomically replaces the JSON database file, and handles the
//! data files the database points at (stat for metadata, deletion).

pub mod data_files;
pub mod json_file;
