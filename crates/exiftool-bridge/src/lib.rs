//! exiftool-backed file I/O for BurstCull
//!
//! The selection core works on in-memory records and rasters. This crate
//! produces those from files on disk and writes the resulting star ratings
//! back:
//!
//! - **Metadata**: one persistent `exiftool -stay_open` process reads capture
//!   time, sub-second counter and exposure settings for a whole session
//! - **Previews**: embedded JPEGs are pulled out of RAW files (`PreviewImage`,
//!   then `JpgFromRaw`, then `ThumbnailImage`) and decoded with `image`
//! - **Ratings**: `XMP:Rating`, `XMP:RatingPercent` and `Rating` written in place

pub mod metadata;
pub mod preview;
pub mod rating;
pub mod runner;

pub use metadata::{file_modified_time, parse_capture_time, records_from_json};
pub use preview::{is_raw_path, PreviewExtractor, PreviewTag, RAW_EXTENSIONS};
pub use rating::rating_percent;
pub use runner::{is_available, ExiftoolRunner, DEFAULT_PROGRAM};
