//! `weft_core` is the core library for the weft text-inclusion engine. It
//! scans source text (JavaScript, CSS, CoffeeScript, Stylus, ...) line by
//! line for directive comments that name another resource — a local file, a
//! directory, a remote URL, or plugin-produced content — fetches and
//! recursively expands that resource, converts it between dialects when
//! required, and splices everything back together in the original line order,
//! no matter how the underlying fetches interleave.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Source text
//!   → Engine (splits writes into lines, serializes batches)
//!   → Scanner (matches per-dialect directive comments: //=  /*= */  #=)
//!   → Resolver (aliases, variables, fallbacks, multi-targets,
//!               local candidate probing, remote delegation)
//!   → Converter registry (dialect normalization, e.g. coffee2js)
//!   → recursive re-expansion of the fetched content
//!   → order-preserving reassembly and end-of-stream conversion
//! ```
//!
//! ## Key Types
//!
//! - [`Weft`] — the expansion engine: `write` chunks in, subscribe to
//!   [`Event`]s, `end` to collect the final [`WeftOutput`].
//! - [`WeftConfig`] — per-instance configuration: dialects, working
//!   directory, alias table, directive pattern overrides, tolerance and
//!   abort policies, base settings, per-converter option blocks.
//! - [`ConverterRegistry`] — ordered async transform chains keyed by
//!   conversion id (`coffee2js`, `styl2css`, ...), registered by the host.
//! - [`Fetch`] — the remote transport collaborator; [`HttpFetch`] is the
//!   reqwest-backed default.
//! - [`Plugin`] / [`PluginRegistry`] — the open extension point for
//!   directive actions beyond `include` and `set`.
//!
//! ## Directives
//!
//! A directive is a comment-embedded line such as `//= lib/util` or
//! `//=set version "1.2.0"`. Targets understand aliases (`vendor!jquery`),
//! double-brace variables (`lib/part{{version}}`), fallback chains
//! (`local/lib : http://cdn.example.com/lib.js`), multi-targets
//! (`lib/[a, b, c]`), directories, and remote URLs.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weft_core::WeftConfig;
//! use weft_core::expand_file;
//!
//! # async fn demo() -> weft_core::WeftResult<()> {
//! let output = expand_file("src/app.js", WeftConfig::default()).await?;
//! println!("{}", output.content);
//! # Ok(())
//! # }
//! ```

pub use config::*;
pub use convert::*;
pub use engine::*;
pub use error::*;
pub use events::Event;
pub use fetch::*;
pub use plugin::*;
pub use resolver::Resolved;
pub use scanner::*;

pub mod config;
mod convert;
mod engine;
mod error;
mod events;
mod fetch;
mod plugin;
mod resolver;
mod scanner;
