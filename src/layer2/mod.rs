// Layer 2 - Stream merging
// Per-station lists in, one ordered self-coincidence-free stream out

pub mod merger;

pub use merger::{
    EventStreamMerger, MergedStream, MergeStats, MergeWarning, MergeError,
    filter_self_coincidences, has_self_coincidences,
};
