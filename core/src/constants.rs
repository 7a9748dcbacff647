//! All the constants used by the scene and group clusters.
//! Limits follow the Application Cluster specification (1.4, 1.3).

/// Maximum length of a scene or group name.
pub const MAX_NAME_LENGTH: usize = 16;
/// The lowest group id a command may address explicitly.
pub const MIN_GROUP_ID: u16 = 0x0001;
/// Group ids above this are reserved (0xFFF8 - 0xFFFF).
pub const MAX_GROUP_ID: u16 = 0xFFF7;
/// The global scene group. Scenes stored here are not tied to a group.
pub const GLOBAL_SCENE_GROUP: u16 = 0x0000;
pub const MIN_SCENE_ID: u8 = 0x01;
/// Usable scene slots per group, out of the 255 addressable scene ids.
pub const SCENE_TABLE_CAPACITY: usize = 0xFE;
/// Usable group slots per endpoint and fabric.
pub const GROUP_TABLE_CAPACITY: usize = 0xFE;

/// Interaction Model revision reported in messages (8.1.1)
pub const INTERACTION_MODEL_REVISION: u8 = 1;
