// src/models/mod.rs

pub mod certificate;
pub mod comment;
pub mod module;
pub mod quiz;
pub mod topic;
pub mod user;
