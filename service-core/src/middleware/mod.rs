pub mod client;
pub mod metrics;
pub mod security_headers;
pub mod tracing;

pub use self::client::{ClientMeta, client_addr};
pub use self::metrics::{get_metrics, init_metrics, metrics_middleware};
pub use self::security_headers::security_headers_middleware;
pub use self::tracing::request_id_middleware;
