// src/core/mod.rs

pub mod error;
pub mod file_storage;
pub mod models;
