//! Fathom LLM - completion client, structured replies, and prompt bounding
//!
//! Wraps the siumai provider SDK behind a small object-safe trait the research
//! crates (and their tests) program against, and owns everything that keeps
//! prompts inside a model's context window: token counting and the compactor.

pub mod client;
pub mod compactor;
pub mod schema;
pub mod token;

pub use client::*;
pub use compactor::*;
pub use schema::*;
pub use token::*;
