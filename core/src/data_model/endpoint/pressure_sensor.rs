use crate::{
    cluster::pressure_measurement::PressureMeasurementCluster,
    data_model::{device::Endpoint, device_type::DEVICE_TYPE_PRESSURE_SENSOR},
    EndpointId,
};

/// A pressure sensor reporting in kPa with an optional scaled reading.
pub fn endpoint(endpoint_id: EndpointId, cluster: PressureMeasurementCluster) -> Endpoint {
    Endpoint::new(endpoint_id, DEVICE_TYPE_PRESSURE_SENSOR).with_cluster(cluster)
}
