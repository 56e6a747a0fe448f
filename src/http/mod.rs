//! Minimal HTTP layer: request-line routing over the reactor.
//!
//! - [`server`]: [`HttpServer`](server::HttpServer), the accept and read pipeline
//! - [`router`]: routes and the [`RouteHandler`](router::RouteHandler) capability
//! - [`request`]: request-line tokenizer
//! - [`response`]: built-in responses and the [`Response`](response::Response) builder

pub mod request;
pub mod response;
pub mod router;
pub mod server;
