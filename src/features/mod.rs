//! Feature-function registry, the seam toward external indicator
//! computation.

mod registry;

pub use registry::{FeatureError, FeatureFn, FeatureRegistry};
