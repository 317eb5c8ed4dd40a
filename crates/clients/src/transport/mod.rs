//! Transport layer for outbound clients.

pub mod http;

pub use http::HttpTransport;
