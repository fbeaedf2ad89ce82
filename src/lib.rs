pub mod client;
pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod stream;
pub mod transport;

mod util;

pub use client::{Client, StreamHandle};
pub use config::{load_config, ClientConfig};
pub use error::{ClientError, ErrorCategory};
pub use protocol::{Endpoint, NormalizedResponse, RequestDescriptor};
pub use stream::StreamDialect;

/// JSON object with string keys, the shape every decoded response takes.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;
