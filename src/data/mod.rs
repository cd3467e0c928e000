//! Remote data access.
//!
//! - HTTP seam (`transport`)
//! - SMARD index/chunk requests and payload parsing (`smard`)

pub mod smard;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use smard::{DEFAULT_BASE_URL, SmardClient};
pub use transport::{HttpResponse, HttpTransport, Transport};
