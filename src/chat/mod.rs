//! C5 -- a non-blocking, `poll`-driven chat server and client over a small
//! length-prefixed framing protocol.

mod client;
mod error;
mod frame;
mod message;
mod peer;
mod recv_buffer;
mod send_queue;
mod server;
mod socket;

pub use client::Client;
pub use error::ChatError;
pub use message::{Events, Message};
pub use server::Server;
