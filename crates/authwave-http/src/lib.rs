//! authwave-http - reqwest-backed transport for authwave.

mod transport;

pub use transport::{HttpTransport, HttpTransportBuilder};
