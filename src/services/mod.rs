pub mod certification;
pub mod scoring;
