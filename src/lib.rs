pub mod clearnode;
pub mod core;

pub use clearnode::{connect_to_clearnode, ClearNodeBuilder, ClearNodeClient};
pub use core::{
    config::ClearNodeConfig,
    errors::ClearNodeError,
    traits::{AppSessionCommands, ClearNodeRpc, NodeQueries},
    types::*,
};
