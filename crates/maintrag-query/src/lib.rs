//! maintrag Query - Question understanding
//!
//! Turns a free-text question into the structured pieces the analytics
//! engine works with: a [`FilterSpec`](maintrag_core::models::FilterSpec)
//! and exactly one [`Intent`](maintrag_core::models::Intent). Everything
//! here is a pure function of the question text, the dataset catalog and
//! the conversation context.

pub mod extract;
pub mod intent;
pub mod time_range;

pub use extract::{extract_filters, Extraction};
pub use intent::{classify, Classification};
pub use time_range::{parse_time_range, TimeParse, TimeRange};
