mod media;
mod metadata;

pub use media::{MediaInfo, MediaType, year_from_date};
pub use metadata::{EpisodeInfo, ExternalIds, MetadataRecord};
