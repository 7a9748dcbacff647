//! Pressure Measurement (Application Cluster 2.4)
//!
//! MeasuredValue is 10 x pressure in kPa. With the extended feature the
//! cluster also reports ScaledValue = 10^Scale x pressure in Pa.

use bitflags::bitflags;
use once_cell::sync::Lazy;

use crate::{
    cluster::{ClusterDefinition, SceneExtension},
    data_model::handler::{AttributeServer, ClusterTable, ReadContext},
    tlv::{TlvElement, ToTlv},
    AttributeId, ClusterId, Result,
};

pub const CLUSTER_ID: ClusterId = 0x0403;

/// Largest tolerance a sensor may report.
pub const MAX_TOLERANCE: u16 = 0x0800;

#[repr(u16)]
#[derive(FromPrimitive)]
pub enum Attributes {
    MeasuredValue = 0x0000,
    MinMeasuredValue = 0x0001,
    MaxMeasuredValue = 0x0002,
    Tolerance = 0x0003,
    ScaledValue = 0x0010,
    MinScaledValue = 0x0011,
    MaxScaledValue = 0x0012,
    ScaledTolerance = 0x0013,
    Scale = 0x0014,
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct Feature: u32 {
        /// Extended range and resolution
        const EXTENDED = 0b00000001;
    }
}

/// A reading with the bounds it was taken within. `None` means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measurement {
    pub value: Option<i16>,
    pub min: Option<i16>,
    pub max: Option<i16>,
    pub tolerance: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScaledMeasurement {
    pub measurement: Measurement,
    pub scale: i8,
}

pub struct PressureMeasurementCluster {
    measured: Measurement,
    scaled: Option<ScaledMeasurement>,
}

impl PressureMeasurementCluster {
    pub fn new(measured: Measurement) -> Self {
        Self {
            measured: Self::bounded(measured),
            scaled: None,
        }
    }

    /// A sensor with extended range and resolution.
    pub fn extended(measured: Measurement, scaled: ScaledMeasurement) -> Self {
        Self {
            measured: Self::bounded(measured),
            scaled: Some(ScaledMeasurement {
                measurement: Self::bounded(scaled.measurement),
                scale: scaled.scale,
            }),
        }
    }

    // MinMeasuredValue may not be below -32767
    fn bounded(measurement: Measurement) -> Measurement {
        Measurement {
            min: measurement.min.map(|min| min.max(-32767)),
            tolerance: measurement.tolerance.min(MAX_TOLERANCE),
            ..measurement
        }
    }

    pub fn features(&self) -> Feature {
        if self.scaled.is_some() {
            Feature::EXTENDED
        } else {
            Feature::empty()
        }
    }

    pub fn set_measured_value(&mut self, value: Option<i16>) {
        self.measured.value = value;
    }

    /// Ignored unless the cluster is extended.
    pub fn set_scaled_value(&mut self, value: Option<i16>) {
        if let Some(scaled) = self.scaled.as_mut() {
            scaled.measurement.value = value;
        }
    }

    fn scaled(&self) -> ScaledMeasurement {
        self.scaled.unwrap_or_default()
    }

    fn get_measured_value(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.measured.value.to_tlv())
    }

    fn get_min_measured_value(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.measured.min.to_tlv())
    }

    fn get_max_measured_value(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.measured.max.to_tlv())
    }

    fn get_tolerance(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.measured.tolerance.to_tlv())
    }

    fn get_scaled_value(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.scaled().measurement.value.to_tlv())
    }

    fn get_min_scaled_value(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.scaled().measurement.min.to_tlv())
    }

    fn get_max_scaled_value(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.scaled().measurement.max.to_tlv())
    }

    fn get_scaled_tolerance(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.scaled().measurement.tolerance.to_tlv())
    }

    fn get_scale(&self, _ctx: &ReadContext<'_>) -> Result<TlvElement> {
        Ok(self.scaled().scale.to_tlv())
    }
}

static TABLE: Lazy<ClusterTable<PressureMeasurementCluster>> = Lazy::new(|| {
    type C = PressureMeasurementCluster;
    ClusterTable::new()
        .attribute(AttributeServer::new(
            Attributes::MeasuredValue as _,
            "MeasuredValue",
            C::get_measured_value,
        ))
        .attribute(AttributeServer::new(
            Attributes::MinMeasuredValue as _,
            "MinMeasuredValue",
            C::get_min_measured_value,
        ))
        .attribute(AttributeServer::new(
            Attributes::MaxMeasuredValue as _,
            "MaxMeasuredValue",
            C::get_max_measured_value,
        ))
        .attribute(AttributeServer::new(
            Attributes::Tolerance as _,
            "Tolerance",
            C::get_tolerance,
        ))
        .attribute(AttributeServer::new(
            Attributes::ScaledValue as _,
            "ScaledValue",
            C::get_scaled_value,
        ))
        .attribute(AttributeServer::new(
            Attributes::MinScaledValue as _,
            "MinScaledValue",
            C::get_min_scaled_value,
        ))
        .attribute(AttributeServer::new(
            Attributes::MaxScaledValue as _,
            "MaxScaledValue",
            C::get_max_scaled_value,
        ))
        .attribute(AttributeServer::new(
            Attributes::ScaledTolerance as _,
            "ScaledTolerance",
            C::get_scaled_tolerance,
        ))
        .attribute(AttributeServer::new(
            Attributes::Scale as _,
            "Scale",
            C::get_scale,
        ))
});

impl ClusterDefinition for PressureMeasurementCluster {
    const ID: ClusterId = CLUSTER_ID;
    const NAME: &'static str = "PressureMeasurement";
    const REVISION: u16 = 3;

    fn table() -> &'static ClusterTable<Self> {
        &TABLE
    }

    fn feature_map(&self) -> u32 {
        self.features().bits()
    }

    /// Scaled attributes only exist with the extended feature.
    fn supports_attribute(&self, attribute: AttributeId) -> bool {
        attribute < Attributes::ScaledValue as AttributeId || self.scaled.is_some()
    }
}

/// No scene-capable attributes.
impl SceneExtension for PressureMeasurementCluster {}

#[cfg(test)]
mod tests {
    use crate::{
        cluster::{ClusterServer, GlobalAttributes, SceneExtension},
        data_model::{device::Endpoint, endpoint::pressure_sensor},
        fabric::FabricTable,
        Error,
    };

    use super::*;

    fn read(endpoint: &Endpoint, attribute: AttributeId) -> Result<TlvElement> {
        let fabrics = FabricTable::new();
        let ctx = ReadContext {
            session: None,
            fabrics: &fabrics,
            endpoint,
        };
        endpoint
            .cluster(CLUSTER_ID)
            .unwrap()
            .read_attribute(attribute, &ctx)
    }

    #[test]
    fn test_basic_sensor_hides_scaled_attributes() {
        let mut cluster = PressureMeasurementCluster::new(Measurement {
            value: Some(1013),
            min: Some(-32768),
            max: Some(1100),
            tolerance: 0x0900,
        });
        cluster.set_scaled_value(Some(5));
        let endpoint = pressure_sensor::endpoint(1, cluster);

        assert_eq!(read(&endpoint, 0x0000).unwrap(), TlvElement::Signed(1013));
        assert_eq!(read(&endpoint, 0x0001).unwrap(), TlvElement::Signed(-32767));
        assert_eq!(read(&endpoint, 0x0003).unwrap(), TlvElement::Unsigned(0x0800));
        assert!(matches!(
            read(&endpoint, 0x0010),
            Err(Error::UnsupportedAttribute {
                cluster: CLUSTER_ID,
                attribute: 0x0010
            })
        ));
        assert_eq!(
            read(&endpoint, GlobalAttributes::FeatureMap as _).unwrap(),
            TlvElement::Unsigned(0)
        );
        let attributes = endpoint.cluster(CLUSTER_ID).unwrap().attribute_list();
        assert!(attributes.contains(&0x0003));
        assert!(!attributes.contains(&0x0014));
        assert!(endpoint.cluster(CLUSTER_ID).unwrap().extract_scene_fields().is_empty());
    }

    #[test]
    fn test_extended_sensor() {
        let mut cluster = PressureMeasurementCluster::extended(
            Measurement::default(),
            ScaledMeasurement {
                measurement: Measurement {
                    value: None,
                    min: Some(0),
                    max: Some(11000),
                    tolerance: 3,
                },
                scale: -1,
            },
        );
        cluster.set_measured_value(None);
        cluster.set_scaled_value(Some(10132));
        let endpoint = pressure_sensor::endpoint(1, cluster);

        assert_eq!(read(&endpoint, 0x0000).unwrap(), TlvElement::Null);
        assert_eq!(read(&endpoint, 0x0010).unwrap(), TlvElement::Signed(10132));
        assert_eq!(read(&endpoint, 0x0014).unwrap(), TlvElement::Signed(-1));
        assert_eq!(
            read(&endpoint, GlobalAttributes::FeatureMap as _).unwrap(),
            TlvElement::Unsigned(1)
        );
        assert_eq!(
            read(&endpoint, GlobalAttributes::ClusterRevision as _).unwrap(),
            TlvElement::Unsigned(3)
        );
        assert_eq!(
            read(&endpoint, GlobalAttributes::AcceptedCommandList as _).unwrap(),
            TlvElement::Array(Vec::new())
        );
    }
}
