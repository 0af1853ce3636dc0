//! Derived signals computed over stored entities: per-PR attention flags
//! (spec §4.8.1) and the enriched review summary assembled for the API
//! (spec §4.8.2). Pure functions over already-fetched data — no I/O here.

pub mod attention;
pub mod review_summary;

pub use attention::{compute_attention_signals, AttentionInput, AttentionSignals};
pub use review_summary::{
    build_review_summary, is_nitpick, AggregateReviewStatus, PrReviewSummary, ReviewThread,
    Suggestion,
};
