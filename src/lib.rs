//! Tessera - ERC1155 token pool connector core.
//!
//! Bridges a multi-tenant digital-asset platform and an ERC1155 mixed
//! fungible/non-fungible contract. Outbound pool operations (create, mint,
//! transfer, burn, approve, balance) go through a chain-invocation client;
//! inbound raw contract events arrive from a durable event-stream transport
//! and are normalized into domain notifications.
//!
//! The two collaborators are consumed behind the [`transport`] traits and
//! implemented elsewhere (see the `tessera-evmconnect` crate); everything in
//! this crate is a deterministic transform over what they deliver.

pub mod abi;
pub mod decoder;
pub mod error;
pub mod event;
pub mod ids;
pub mod names;
pub mod notification;
pub mod ops;
pub mod sink;
pub mod subscriptions;
pub mod transport;

pub use decoder::EventNormalizer;
pub use error::ConnectorError;
pub use event::GatewayEvent;
pub use notification::TokenNotification;
pub use ops::TokenOps;
pub use sink::NotificationSink;
pub use subscriptions::SubscriptionManager;
pub use transport::{ChainClient, StreamTransport};
