// src/core/models/mod.rs

pub mod kind;
pub mod entity;

pub use kind::*;
pub use entity::*;
