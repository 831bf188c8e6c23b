mod cost;
mod error;
mod plan;
mod range;
pub mod special;

pub use cost::{CostModel, LogIntegral};
pub use error::{PartitionError, Result};
pub use plan::{Assignment, Candidates, PartitionMode, PartitionPlan, Segment, Stride};
pub use range::{
    DEFAULT_MARGIN, MIN_ROW_CAPACITY, RangePartitioner, VARIATION_SIGMAS, clamp_workers,
    row_capacity, with_variation,
};
