//! Concrete bindings for the taskdeck sync core: REST transport, timeout
//! wrapper, in-memory backend and configuration loading.

pub mod config_loader;
pub mod http_transport;
pub mod memory_transport;
pub mod paths;
pub mod timeout;

pub use config_loader::{API_URL_ENV, ConfigLoader};
pub use http_transport::HttpTransport;
pub use memory_transport::InMemoryTransport;
pub use paths::TaskdeckPaths;
pub use timeout::TimeoutTransport;
