//! Audience segmentation: builds attribute-based client groups and greedily
//! selects a few of them to cover as much of the population as possible.

pub mod attributes;
pub mod builder;
pub mod engine;
pub mod filters;
pub mod population;
pub mod report;
pub mod selector;
pub mod tools;

/// Upper bound on segments returned per strategy.
pub const MAX_SEGMENT_GROUPS: usize = 5;

/// Smallest automatic group, and the default marginal-gain floor.
pub const MIN_GROUP_SIZE: usize = 3;

/// Entries of the automatic attribute list scanned by default.
pub const DEFAULT_AUTOMATIC_ATTRIBUTES: usize = 8;

pub use attributes::ClientProfile;
pub use builder::{SegmentBuilder, SegmentationMode};
pub use engine::{SegmentationEngine, StrategyPlan};
pub use population::{ClientSource, InMemoryClientSource, JsonFileClientSource};
pub use selector::{CoverageSelector, SelectionLimits};
pub use tools::{register_segmentation_tool, ToolRegistry};
