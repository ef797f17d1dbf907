//! User profile: the accumulated record and the merge rules that build it.

pub mod accumulator;
pub mod model;

pub use accumulator::{MergePath, merge, merge_flo_import, merge_identity, merge_with_identity};
pub use model::{PartialProfile, UserProfile, WorkoutIntensity};
