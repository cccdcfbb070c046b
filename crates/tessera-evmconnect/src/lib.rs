//! Blockchain gateway client for the Tessera connector.
//!
//! Implements the core's collaborator traits against a REST/WebSocket
//! gateway: [`EvmConnect`] covers the event-stream transport and the
//! chain-invocation client over HTTP, [`EventStreamSocket`] consumes the
//! gateway's WebSocket delivery of raw contract events.

pub mod client;
pub mod socket;

pub use client::EvmConnect;
pub use socket::EventStreamSocket;
