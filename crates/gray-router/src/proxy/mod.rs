//! The HTTP reverse proxy: accept loop, request handling and forwarding.

pub mod client;
pub mod forwarding;
pub mod handler;
pub mod network;
pub mod server;

pub use client::{create_http_client, HttpClient, PinnedResolver};
pub use forwarding::{service_unavailable, BufferedRequest, ForwardError, Forwarder, HOP_HEADER};
pub use handler::{handle_request, RequestHandlerContext};
pub use network::create_reusable_listener;
pub use server::RouterServer;
