pub mod domain;
pub mod engine;
pub mod pattern;

pub use engine::RedirectEngine;
