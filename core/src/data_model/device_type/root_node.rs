use crate::data_model::device::DeviceType;

/// Root Node (Device Library 2.1)
pub const DEVICE_TYPE_ROOT_NODE: DeviceType = DeviceType {
    device_type: 0x0016,
    device_revision: 1,
};
