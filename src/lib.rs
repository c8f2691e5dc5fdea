// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod archive;
pub mod bundle;
pub mod config;
pub mod dates;
pub mod extract;
pub mod fetch;
pub mod input;
pub mod note;
pub mod outpath;
pub mod pipeline;
pub mod render;
pub mod report;
pub mod tags;

// ---- Re-exports for stable public API ----
// Convenient access to the types bins/tests touch most.
pub use config::{Overrides, RunConfig, Settings};
pub use fetch::{FetchError, FetchedPage, HttpTransport, PageClient, Transport};
pub use input::{InlineMeta, SourceRecord};
pub use note::{Note, NoteMeta, NoteStatus};
pub use pipeline::Pipeline;
pub use report::RunTally;
