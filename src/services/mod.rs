// src/services/mod.rs

pub mod sessions;

pub use sessions::SessionManager;
