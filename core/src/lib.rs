//! Command invocation and fabric-scoped scene/group state for Matter
//! application clusters.
//!
//! An invocation enters through [`interaction_model::transaction::Transaction`],
//! is resolved against a [`data_model::device::Node`] (endpoint, cluster,
//! command), decoded with the command's request schema, handed to the
//! cluster server's handler and encoded back with the response schema.

#[macro_use]
extern crate num_derive;

/// Cluster definitions and servers
pub mod cluster;
pub mod constants;
pub mod data_model;
pub mod error;
pub mod fabric;
pub mod interaction_model;
pub mod message;
pub mod session_context;
pub mod storage;
pub mod tlv;

pub use error::{Error, Result};

pub type EndpointId = u16;
pub type ClusterId = u32;
pub type AttributeId = u32;
pub type CommandId = u32;
pub type GroupId = u16;
pub type SceneId = u8;
pub type NodeId = u64;
