// Generic stream resolver: follows iframes and redirects on a web page until
// it reaches HLS, HDS, DASH or progressive HTTP playlists.
pub mod builder;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod media;
pub mod options;
pub mod parser;
pub mod policy;
pub mod repair;
pub mod scanner;
pub mod session;
pub mod utils;

// Export common types for ease of use
pub use builder::StreamBuilder;
pub use dispatch::{Priority, RESOLVE_PREFIX, can_handle_url, priority};
pub use engine::Resolver;
pub use error::{FetchError, ResolveError};
pub use fetch::{FetchRequest, FetchResponse, HttpFetcher, PageFetcher, RequestProfile};
pub use media::{PlaylistDescriptor, Stream, StreamFormat, StreamMap};
pub use options::{ResolveOptions, parse_comma_list};
pub use parser::{ManifestParser, PlaylistParser};
pub use policy::{FilterVerdict, Policy, RejectReason};
pub use repair::{RepairedUrl, repair_url, update_scheme};
pub use scanner::{Candidate, CandidateKind, ScanResult};
pub use session::ResolutionSession;

/// Resolves `url` with the default HTTP client and a fresh session.
pub async fn resolve(url: &str, options: &ResolveOptions) -> Result<StreamMap, ResolveError> {
    Resolver::with_default_client()?.resolve(url, options).await
}
