// src/engine/mod.rs

pub mod aggregate;
pub mod session;
pub mod timer;
