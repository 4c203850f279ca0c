// ABOUTME: Shared configuration crate for Crucible services
// ABOUTME: Exposes environment variable names and typed env parsing helpers

pub mod constants;
pub mod env;
