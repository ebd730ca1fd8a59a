// src/handlers/mod.rs

pub mod analytics;
pub mod auth;
pub mod community;
pub mod sessions;
