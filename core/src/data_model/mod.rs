//! Defines core types in the data model

pub mod device;
pub mod device_type;
pub mod endpoint;
pub mod handler;
