//! Paints range highlight payloads onto rendered code blocks.
//!
//! The runtime never touches markup. It resolves payload offsets to text
//! positions, registers one named highlight per runtime scope and writes
//! `::highlight()` rules for scopes that carry styles. Everything it needs
//! from the document goes through [`HighlightHost`]; [`MemoryDocument`] is
//! an in-memory host for tests and the CLI.

pub mod apply;
pub mod diagnostics;
pub mod host;
pub mod lazy;
pub mod memory;
pub mod options;
pub mod payload_source;
pub mod segments;
pub mod state;
pub mod view;

pub use apply::{HighlightRuntime, RUNTIME_STYLE_TAG_ID, runtime_scope_name};
pub use diagnostics::{ApplyOutcome, ClearOutcome, Diagnostic, DiagnosticKind, SkipReason};
pub use host::{
    CodeBlock, HighlightHost, HostError, IntersectionEntry, NodeId, ObserverConfig, ObserverId,
    TextNode, TextPosition, TextRange, VisibilityHost, WatchId,
};
pub use lazy::{LazyController, LazyOptions};
pub use memory::MemoryDocument;
pub use options::{ApplyOptions, ColorScheme, PayloadMap};
pub use payload_source::{payload_map, payload_map_from_document};
