pub mod auth;
pub mod builder;
pub mod client;
pub mod codec;
pub mod connection;
pub mod registry;
pub mod rpc;
pub mod signer;
pub mod types;

// Re-export main components
pub use builder::{connect_to_clearnode, ClearNodeBuilder};
pub use client::ClearNodeClient;
pub use codec::{ClearNodeCodec, RpcFailure, RpcFrame, RpcRequest, RpcResponse, SignedRequest};
pub use connection::{ClearNodeConnection, ConnectionState, TRANSPORT_FAILURE};
pub use registry::{FrameDisposition, Outbound, PendingRegistry};
pub use rpc::RpcMessageFactory;
pub use signer::EcdsaSigner;
pub use types::*;
