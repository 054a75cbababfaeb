// Middleware for the proxy server

pub mod cors;

pub use cors::*;
