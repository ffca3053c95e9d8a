// Linkstore Library
// Content-addressed cache of derived artifacts with racing resolution

pub mod config;
pub mod content;
pub mod error;
pub mod linkstore;
pub mod logging;
pub mod race;
pub mod resolver;
pub mod transform;
