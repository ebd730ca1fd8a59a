// src/models/mod.rs

pub mod community;
pub mod context;
pub mod question;
pub mod session;
pub mod user;
