// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod certificate;
pub mod forum;
pub mod module;
pub mod quiz;
