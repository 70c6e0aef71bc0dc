//! WS-Management plumbing for the Windows Remote Shell resource
//!
//! `envelope` renders SOAP requests, `response` pulls the few fields the
//! console needs out of the replies, `client` moves them over HTTP and
//! `encryption` frames them when they travel sealed.

pub mod client;
pub mod encryption;
pub mod envelope;
pub mod response;

pub use client::{Reply, WsmanClient};
pub use response::{Fault, ReceiveChunk};
