//! ERC1155 mixed fungible/non-fungible contract ABI fragments.
//!
//! The gateway takes method and event descriptors as standard JSON ABI, so
//! the fragments here are typed structs that serialize to that shape. Event
//! dispatch in the normalizer keys off the canonical signature strings.

use serde::{Deserialize, Serialize};

/// Canonical event signatures emitted by the contract.
pub mod signatures {
    /// TokenPoolCreation(address indexed operator, uint256 indexed type_id, bytes data)
    pub const TOKEN_POOL_CREATION: &str = "TokenPoolCreation(address,uint256,bytes)";

    /// TransferSingle(address indexed operator, address indexed from, address indexed to, uint256 id, uint256 value)
    pub const TRANSFER_SINGLE: &str = "TransferSingle(address,address,address,uint256,uint256)";

    /// TransferBatch(address indexed operator, address indexed from, address indexed to, uint256[] ids, uint256[] values)
    pub const TRANSFER_BATCH: &str = "TransferBatch(address,address,address,uint256[],uint256[])";

    /// ApprovalForAll(address indexed account, address indexed operator, bool approved)
    pub const APPROVAL_FOR_ALL: &str = "ApprovalForAll(address,address,bool)";
}

/// Strip the parameter list from a signature, leaving the event name.
pub fn event_name(signature: &str) -> &str {
    signature.split('(').next().unwrap_or(signature)
}

/// One input parameter of a method or event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed: Option<bool>,
}

impl Param {
    fn input(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            indexed: None,
        }
    }

    fn indexed(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            indexed: Some(true),
        }
    }
}

/// A contract event descriptor in JSON ABI shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAbi {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub inputs: Vec<Param>,
}

impl EventAbi {
    fn new(name: &str, inputs: Vec<Param>) -> Self {
        Self {
            name: name.to_string(),
            kind: "event".to_string(),
            inputs,
        }
    }

    /// Canonical signature string, e.g. `TransferSingle(address,address,address,uint256,uint256)`.
    pub fn signature(&self) -> String {
        let kinds: Vec<&str> = self.inputs.iter().map(|p| p.kind.as_str()).collect();
        format!("{}({})", self.name, kinds.join(","))
    }
}

/// A contract method descriptor in JSON ABI shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodAbi {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub inputs: Vec<Param>,
    #[serde(default)]
    pub outputs: Vec<Param>,
}

impl MethodAbi {
    fn new(name: &str, inputs: Vec<Param>, outputs: Vec<Param>) -> Self {
        Self {
            name: name.to_string(),
            kind: "function".to_string(),
            inputs,
            outputs,
        }
    }
}

pub fn token_pool_creation_event() -> EventAbi {
    EventAbi::new(
        "TokenPoolCreation",
        vec![
            Param::indexed("operator", "address"),
            Param::indexed("type_id", "uint256"),
            Param::input("data", "bytes"),
        ],
    )
}

pub fn transfer_single_event() -> EventAbi {
    EventAbi::new(
        "TransferSingle",
        vec![
            Param::indexed("operator", "address"),
            Param::indexed("from", "address"),
            Param::indexed("to", "address"),
            Param::input("id", "uint256"),
            Param::input("value", "uint256"),
        ],
    )
}

pub fn transfer_batch_event() -> EventAbi {
    EventAbi::new(
        "TransferBatch",
        vec![
            Param::indexed("operator", "address"),
            Param::indexed("from", "address"),
            Param::indexed("to", "address"),
            Param::input("ids", "uint256[]"),
            Param::input("values", "uint256[]"),
        ],
    )
}

pub fn approval_for_all_event() -> EventAbi {
    EventAbi::new(
        "ApprovalForAll",
        vec![
            Param::indexed("account", "address"),
            Param::indexed("operator", "address"),
            Param::input("approved", "bool"),
        ],
    )
}

pub fn create_method() -> MethodAbi {
    MethodAbi::new(
        "create",
        vec![
            Param::input("is_fungible", "bool"),
            Param::input("data", "bytes"),
        ],
        vec![],
    )
}

pub fn mint_fungible_method() -> MethodAbi {
    MethodAbi::new(
        "mintFungible",
        vec![
            Param::input("type_id", "uint256"),
            Param::input("to", "address[]"),
            Param::input("amounts", "uint256[]"),
            Param::input("data", "bytes"),
        ],
        vec![],
    )
}

pub fn mint_non_fungible_method() -> MethodAbi {
    MethodAbi::new(
        "mintNonFungible",
        vec![
            Param::input("type_id", "uint256"),
            Param::input("to", "address[]"),
            Param::input("data", "bytes"),
        ],
        vec![],
    )
}

pub fn safe_transfer_from_method() -> MethodAbi {
    MethodAbi::new(
        "safeTransferFrom",
        vec![
            Param::input("from", "address"),
            Param::input("to", "address"),
            Param::input("id", "uint256"),
            Param::input("amount", "uint256"),
            Param::input("data", "bytes"),
        ],
        vec![],
    )
}

pub fn burn_method() -> MethodAbi {
    MethodAbi::new(
        "burn",
        vec![
            Param::input("from", "address"),
            Param::input("id", "uint256"),
            Param::input("amount", "uint256"),
            Param::input("data", "bytes"),
        ],
        vec![],
    )
}

pub fn set_approval_for_all_method() -> MethodAbi {
    MethodAbi::new(
        "setApprovalForAllWithData",
        vec![
            Param::input("operator", "address"),
            Param::input("approved", "bool"),
            Param::input("data", "bytes"),
        ],
        vec![],
    )
}

pub fn balance_of_method() -> MethodAbi {
    MethodAbi::new(
        "balanceOf",
        vec![
            Param::input("account", "address"),
            Param::input("id", "uint256"),
        ],
        vec![Param::input("", "uint256")],
    )
}

pub fn uri_method() -> MethodAbi {
    MethodAbi::new(
        "uri",
        vec![Param::input("id", "uint256")],
        vec![Param::input("", "string")],
    )
}

/// Candidate method ABIs attached to every subscription so the transport can
/// decode the call input that produced an event.
pub fn subscription_method_candidates() -> Vec<MethodAbi> {
    vec![
        create_method(),
        mint_fungible_method(),
        mint_non_fungible_method(),
        safe_transfer_from_method(),
        burn_method(),
        set_approval_for_all_method(),
    ]
}
