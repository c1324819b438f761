//! Inbound channels. The HTTP API is the only one.

pub mod web;
