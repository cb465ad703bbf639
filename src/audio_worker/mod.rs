mod download;
mod engine;
mod messages;
mod null_engine;
mod player;
mod transport;

pub use download::{Downloader, build_http_client, fetch_to_path};
pub use engine::{RodioTransport, TransportConfig};
pub use messages::{LoadedStream, TransportStatus};
pub use null_engine::{NullTransport, NullTransportHandle, TransportCall};
pub use transport::{Transport, is_remote_uri, local_path_from_uri};
