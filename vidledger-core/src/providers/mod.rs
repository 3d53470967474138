pub mod traits;
pub mod youtube;

pub use traits::{DurationLookup, PlaylistSource, ProviderError};
pub use youtube::{YoutubeCredentials, YoutubeProvider};
