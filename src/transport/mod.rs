// SPDX-License-Identifier: GPL-3.0-only
pub mod traits;
pub mod client;

pub use traits::{BodyStream, Transport, TransportError};
pub use client::HttpTransport;
