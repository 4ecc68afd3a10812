//! BurstCull: picks the best frame of every burst in a shooting session and
//! rates it, leaving the rest with a low rating for review or deletion.

pub mod pipeline;
pub mod report;
pub mod scan;

pub use pipeline::{run, DryRun, MetadataSource, PreviewDecoder, RatingSink};
pub use report::{BurstReport, CullReport, PhotoReport, RunSummary};
pub use scan::{is_supported, scan_folder};
