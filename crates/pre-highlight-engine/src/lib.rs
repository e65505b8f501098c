pub mod classify;
pub mod fence;
pub mod markdown;
pub mod payload;
pub mod provider;

// Re-export key types for easier usage
pub use classify::{Bucket, ClassifierOptions, ScopeClassifier, ScopeMode, ScopeQuery};
pub use fence::{
    FallbackMode, FallbackReason, FenceDecision, FenceError, FenceInfo, FenceOutput,
    FenceRenderer, HighlightOptions, LineFeatureStrategy, RenderEnv, ThemeSelection, Transport,
};
pub use markdown::render_markdown;
pub use payload::{
    BuildError, HighlightPayload, RangeTuple, ScopeStyle, ThemeVariant, TokenEntry, build_payload,
};
pub use provider::{HighlightProvider, ProviderError, ProviderOutput, ProviderRequest};
