//! Generation backend interface.
//!
//! Every interaction with the generative model goes through the [`Backend`]
//! trait: plain text in, plain text (or nothing) out. It is used three ways:
//!
//! ```text
//! acquire_plan ----complete(plan prompt)----> Backend
//!              ----complete(repair prompt)--> Backend   (at most once)
//! Materializer ----complete(file prompt)----> Backend   (once per file)
//! ```

pub mod claude_code;
pub mod trait_def;

pub use claude_code::ClaudeCodeBackend;
pub use trait_def::Backend;
