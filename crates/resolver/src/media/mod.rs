pub mod stream;
pub mod stream_format;

pub use stream::{Stream, StreamMap};
pub use stream_format::{PlaylistDescriptor, StreamFormat};
