use super::device::DeviceType;

pub mod root_node;

pub const DEVICE_TYPE_ON_OFF_LIGHT: DeviceType = DeviceType {
    device_type: 0x0100,
    device_revision: 2,
};

pub const DEVICE_TYPE_DIMMABLE_LIGHT: DeviceType = DeviceType {
    device_type: 0x0101,
    device_revision: 2,
};

pub const DEVICE_TYPE_PRESSURE_SENSOR: DeviceType = DeviceType {
    device_type: 0x0305,
    device_revision: 2,
};

pub const DEVICE_TYPE_AGGREGATOR: DeviceType = DeviceType {
    device_type: 0x000e,
    device_revision: 1,
};
