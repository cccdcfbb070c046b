//! Configuration for the connector binary.

use clap::Parser;
use url::Url;

/// ERC1155 token pool connector.
///
/// Bridges a digital-asset platform and an ERC1155 mixed fungible/
/// non-fungible contract through a blockchain gateway: outbound pool
/// operations become signed contract calls, inbound contract events become
/// normalized notifications.
///
/// # Examples
///
/// ```bash
/// # Run against a local gateway, activating one fungible pool
/// tessera-connector --instance-path contracts/erc1155 \
///     --contract-address 0x1c197dbc... --pool F1
///
/// # Activate a pool on an external contract with app correlation data
/// tessera-connector --instance-path contracts/erc1155 \
///     --contract-address 0x1c197dbc... --pool 'N2&0xdef&500=my-app'
/// ```
#[derive(Parser, Debug)]
#[command(name = "tessera-connector")]
#[command(about = "ERC1155 token pool connector", long_about = None)]
pub struct Config {
    /// Gateway REST base URL
    #[arg(
        long,
        env = "TESSERA_GATEWAY_URL",
        default_value = "http://127.0.0.1:5102/"
    )]
    pub gateway_url: Url,

    /// Gateway WebSocket URL for event delivery
    #[arg(
        long,
        env = "TESSERA_GATEWAY_WS_URL",
        default_value = "ws://127.0.0.1:5102/ws"
    )]
    pub gateway_ws_url: Url,

    /// Event stream topic (namespace)
    #[arg(long, env = "TESSERA_TOPIC", default_value = "tessera")]
    pub topic: String,

    /// Connector instance path, scoping stream and subscription names
    #[arg(long, env = "TESSERA_INSTANCE_PATH")]
    pub instance_path: String,

    /// Default ERC1155 contract address
    #[arg(long, env = "TESSERA_CONTRACT_ADDRESS")]
    pub contract_address: String,

    /// Starting block for the base pool-creation subscription
    #[arg(long)]
    pub from_block: Option<String>,

    /// Legacy stream names the migration check probes, in order
    /// (comma-separated; defaults to the known historical schemes)
    #[arg(long, value_delimiter = ',')]
    pub legacy_stream_name: Vec<String>,

    /// Pools to activate at startup, as `locator` or `locator=poolData`
    /// (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub pool: Vec<String>,
}

impl Config {
    /// Split a `--pool` entry into locator and optional pool data.
    pub fn parse_pool(entry: &str) -> (&str, Option<&str>) {
        match entry.split_once('=') {
            Some((locator, pool_data)) => (locator, Some(pool_data)),
            None => (entry, None),
        }
    }
}
