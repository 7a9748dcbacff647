use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    constants::GLOBAL_SCENE_GROUP,
    interaction_model::StatusCode,
    tlv::{DecodeError, FromTlv, StructBuilder, StructReader, TlvElement, ToTlv},
    AttributeId, ClusterId, GroupId, SceneId,
};

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct NameSupport: u8 {
        const SCENE_NAMES = 0b10000000;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct CopyMode: u8 {
        const COPY_ALL_SCENES = 0b00000001;
    }
}

impl ToTlv for NameSupport {
    fn to_tlv(&self) -> TlvElement {
        self.bits().to_tlv()
    }
}

impl FromTlv for CopyMode {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        Ok(CopyMode::from_bits_truncate(u8::from_tlv(element)?))
    }
}

/// One recorded attribute value of a scene-capable cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValuePair {
    pub attribute_id: Option<AttributeId>,
    pub attribute_value: Vec<TlvElement>,
}

impl AttributeValuePair {
    pub fn new(attribute_id: AttributeId, value: TlvElement) -> Self {
        Self {
            attribute_id: Some(attribute_id),
            attribute_value: vec![value],
        }
    }

    pub fn value(&self) -> Option<&TlvElement> {
        self.attribute_value.first()
    }

    /// The recorded value of `attribute` in a field set.
    pub fn find(values: &[AttributeValuePair], attribute: AttributeId) -> Option<&TlvElement> {
        values
            .iter()
            .find(|pair| pair.attribute_id == Some(attribute))
            .and_then(AttributeValuePair::value)
    }
}

impl FromTlv for AttributeValuePair {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            attribute_id: reader.optional(0)?,
            attribute_value: reader.field(1)?,
        })
    }
}

impl ToTlv for AttributeValuePair {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .optional(0, self.attribute_id.as_ref())
            .field(1, &self.attribute_value)
            .build()
    }
}

/// The values one cluster contributes to a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionFieldSet {
    pub cluster_id: ClusterId,
    pub attribute_value_list: Vec<AttributeValuePair>,
}

impl FromTlv for ExtensionFieldSet {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            cluster_id: reader.field(0)?,
            attribute_value_list: reader.field(1)?,
        })
    }
}

impl ToTlv for ExtensionFieldSet {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.cluster_id)
            .field(1, &self.attribute_value_list)
            .build()
    }
}

/// A stored scene (Application Cluster 1.4.6.1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneEntry {
    /// 0 for scenes not associated with a group.
    pub group_id: GroupId,
    pub scene_id: SceneId,
    pub name: String,
    pub transition_time: TransitionTime,
    pub extension_field_sets: Vec<ExtensionFieldSet>,
}

/// A transition time kept as whole seconds plus tenths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransitionTime {
    pub seconds: u16,
    pub tenths: u8,
}

impl TransitionTime {
    pub const fn from_seconds(seconds: u16) -> Self {
        Self { seconds, tenths: 0 }
    }

    pub const fn from_deciseconds(deciseconds: u16) -> Self {
        Self {
            seconds: deciseconds / 10,
            tenths: (deciseconds % 10) as u8,
        }
    }

    /// Saturates at `u16::MAX` for times only representable in seconds.
    pub fn as_deciseconds(&self) -> u16 {
        let deciseconds = u32::from(self.seconds) * 10 + u32::from(self.tenths);
        u16::try_from(deciseconds).unwrap_or(u16::MAX)
    }

    pub fn as_secs_f32(&self) -> f32 {
        f32::from(self.seconds) + f32::from(self.tenths) / 10.0
    }
}

/// Scenes of one endpoint within one fabric, keyed by (group, scene).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SceneEntry>", into = "Vec<SceneEntry>")]
pub struct SceneTable {
    entries: BTreeMap<(GroupId, SceneId), SceneEntry>,
}

impl From<Vec<SceneEntry>> for SceneTable {
    fn from(entries: Vec<SceneEntry>) -> Self {
        let mut table = SceneTable::default();
        for entry in entries {
            table.insert(entry);
        }
        table
    }
}

impl From<SceneTable> for Vec<SceneEntry> {
    fn from(table: SceneTable) -> Self {
        table.entries.into_values().collect()
    }
}

impl SceneTable {
    pub fn get(&self, group_id: GroupId, scene_id: SceneId) -> Option<&SceneEntry> {
        self.entries.get(&(group_id, scene_id))
    }

    pub fn contains(&self, group_id: GroupId, scene_id: SceneId) -> bool {
        self.entries.contains_key(&(group_id, scene_id))
    }

    /// Replaces any entry with the same key.
    pub fn insert(&mut self, entry: SceneEntry) -> Option<SceneEntry> {
        self.entries
            .insert((entry.group_id, entry.scene_id), entry)
    }

    pub fn remove(&mut self, group_id: GroupId, scene_id: SceneId) -> Option<SceneEntry> {
        self.entries.remove(&(group_id, scene_id))
    }

    /// Returns how many entries were removed.
    pub fn remove_group(&mut self, group_id: GroupId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(group, _), _| *group != group_id);
        before - self.entries.len()
    }

    /// Removes every scene bound to a group, keeping global scenes.
    pub fn remove_non_global(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|(group, _), _| *group == GLOBAL_SCENE_GROUP);
        before - self.entries.len()
    }

    pub fn group(&self, group_id: GroupId) -> impl Iterator<Item = &SceneEntry> + '_ {
        self.entries
            .range((group_id, SceneId::MIN)..=(group_id, SceneId::MAX))
            .map(|(_, entry)| entry)
    }

    pub fn group_len(&self, group_id: GroupId) -> usize {
        self.group(group_id).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// AddScene and EnhancedAddScene. The transition time is in seconds for the
/// former and in tenths of a second for the latter.
#[derive(Debug, Clone)]
pub struct AddSceneRequest {
    pub group_id: GroupId,
    pub scene_id: SceneId,
    pub transition_time: u16,
    pub scene_name: String,
    pub extension_field_sets: Vec<ExtensionFieldSet>,
}

impl FromTlv for AddSceneRequest {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            group_id: reader.field(0)?,
            scene_id: reader.field(1)?,
            transition_time: reader.field(2)?,
            scene_name: reader.field(3)?,
            extension_field_sets: reader.field(4)?,
        })
    }
}

/// Requests addressing a single scene: view, remove and store.
#[derive(Debug, Clone, Copy)]
pub struct SceneRequest {
    pub group_id: GroupId,
    pub scene_id: SceneId,
}

impl FromTlv for SceneRequest {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            group_id: reader.field(0)?,
            scene_id: reader.field(1)?,
        })
    }
}

/// Requests addressing every scene of a group.
#[derive(Debug, Clone, Copy)]
pub struct GroupScenesRequest {
    pub group_id: GroupId,
}

impl FromTlv for GroupScenesRequest {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            group_id: reader.field(0)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecallSceneRequest {
    pub group_id: GroupId,
    pub scene_id: SceneId,
    pub transition_time: Option<u16>,
}

impl FromTlv for RecallSceneRequest {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            group_id: reader.field(0)?,
            scene_id: reader.field(1)?,
            transition_time: reader.optional(2)?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CopySceneRequest {
    pub mode: CopyMode,
    pub group_id_from: GroupId,
    pub scene_id_from: SceneId,
    pub group_id_to: GroupId,
    pub scene_id_to: SceneId,
}

impl FromTlv for CopySceneRequest {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            mode: reader.field(0)?,
            group_id_from: reader.field(1)?,
            scene_id_from: reader.field(2)?,
            group_id_to: reader.field(3)?,
            scene_id_to: reader.field(4)?,
        })
    }
}

/// Response of add, remove and store (and their enhanced forms).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneStatusResponse {
    pub status: StatusCode,
    pub group_id: GroupId,
    pub scene_id: SceneId,
}

impl ToTlv for SceneStatusResponse {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.status)
            .field(1, &self.group_id)
            .field(2, &self.scene_id)
            .build()
    }
}

impl FromTlv for SceneStatusResponse {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            status: reader.field(0)?,
            group_id: reader.field(1)?,
            scene_id: reader.field(2)?,
        })
    }
}

/// ViewSceneResponse and EnhancedViewSceneResponse. Only the status and the
/// key are present unless the scene was found.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSceneResponse {
    pub status: StatusCode,
    pub group_id: GroupId,
    pub scene_id: SceneId,
    pub transition_time: Option<u16>,
    pub scene_name: Option<String>,
    pub extension_field_sets: Option<Vec<ExtensionFieldSet>>,
}

impl ViewSceneResponse {
    pub fn failed(status: StatusCode, group_id: GroupId, scene_id: SceneId) -> Self {
        Self {
            status,
            group_id,
            scene_id,
            transition_time: None,
            scene_name: None,
            extension_field_sets: None,
        }
    }
}

impl ToTlv for ViewSceneResponse {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.status)
            .field(1, &self.group_id)
            .field(2, &self.scene_id)
            .optional(3, self.transition_time.as_ref())
            .optional(4, self.scene_name.as_ref())
            .optional(5, self.extension_field_sets.as_ref())
            .build()
    }
}

impl FromTlv for ViewSceneResponse {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            status: reader.field(0)?,
            group_id: reader.field(1)?,
            scene_id: reader.field(2)?,
            transition_time: reader.optional(3)?,
            scene_name: reader.optional(4)?,
            extension_field_sets: reader.optional(5)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoveAllScenesResponse {
    pub status: StatusCode,
    pub group_id: GroupId,
}

impl ToTlv for RemoveAllScenesResponse {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.status)
            .field(1, &self.group_id)
            .build()
    }
}

impl FromTlv for RemoveAllScenesResponse {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            status: reader.field(0)?,
            group_id: reader.field(1)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetSceneMembershipResponse {
    pub status: StatusCode,
    /// Null when the capacity is unknown.
    pub capacity: Option<u8>,
    pub group_id: GroupId,
    pub scene_list: Option<Vec<SceneId>>,
}

impl ToTlv for GetSceneMembershipResponse {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.status)
            .field(1, &self.capacity)
            .field(2, &self.group_id)
            .optional(3, self.scene_list.as_ref())
            .build()
    }
}

impl FromTlv for GetSceneMembershipResponse {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            status: reader.field(0)?,
            capacity: reader.optional(1)?,
            group_id: reader.field(2)?,
            scene_list: reader.optional(3)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopySceneResponse {
    pub status: StatusCode,
    pub group_id_from: GroupId,
    pub scene_id_from: SceneId,
}

impl ToTlv for CopySceneResponse {
    fn to_tlv(&self) -> TlvElement {
        StructBuilder::new()
            .field(0, &self.status)
            .field(1, &self.group_id_from)
            .field(2, &self.scene_id_from)
            .build()
    }
}

impl FromTlv for CopySceneResponse {
    fn from_tlv(element: &TlvElement) -> Result<Self, DecodeError> {
        let reader = StructReader::new(element)?;
        Ok(Self {
            status: reader.field(0)?,
            group_id_from: reader.field(1)?,
            scene_id_from: reader.field(2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(group_id: GroupId, scene_id: SceneId) -> SceneEntry {
        SceneEntry {
            group_id,
            scene_id,
            name: format!("scene {scene_id}"),
            transition_time: TransitionTime::from_deciseconds(15),
            extension_field_sets: vec![ExtensionFieldSet {
                cluster_id: 0x0006,
                attribute_value_list: vec![AttributeValuePair::new(0, TlvElement::Boolean(true))],
            }],
        }
    }

    #[test]
    fn test_transition_time_split() {
        let time = TransitionTime::from_deciseconds(125);
        assert_eq!(time.seconds, 12);
        assert_eq!(time.tenths, 5);
        assert_eq!(time.as_deciseconds(), 125);
        assert_eq!(time.as_secs_f32(), 12.5);
        assert_eq!(TransitionTime::from_seconds(u16::MAX).as_deciseconds(), u16::MAX);
    }

    #[test]
    fn test_scene_table_groups() {
        let mut table = SceneTable::default();
        table.insert(entry(0, 1));
        table.insert(entry(1, 1));
        table.insert(entry(1, 2));
        table.insert(entry(2, 255));
        assert!(table.insert(entry(1, 2)).is_some());

        assert_eq!(table.len(), 4);
        assert_eq!(
            table.group(1).map(|e| e.scene_id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(table.group_len(2), 1);

        assert_eq!(table.remove_group(1), 2);
        assert_eq!(table.remove_group(1), 0);
        assert_eq!(table.remove_non_global(), 1);
        assert!(table.contains(0, 1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_scene_table_persists_as_list() {
        let mut table = SceneTable::default();
        table.insert(entry(1, 3));
        table.insert(entry(0, 1));

        let value = serde_json::to_value(&table).unwrap();
        assert!(value.is_array());
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        let restored: SceneTable = serde_json::from_value(value).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn test_decode_add_scene() {
        let request = StructBuilder::new()
            .field(0, &1u16)
            .field(1, &2u8)
            .field(2, &10u16)
            .field(3, "Evening")
            .field(4, &entry(1, 2).extension_field_sets)
            .build();
        let request = AddSceneRequest::from_tlv(&request).unwrap();
        assert_eq!(request.scene_name, "Evening");
        assert_eq!(request.extension_field_sets, entry(1, 2).extension_field_sets);

        let out_of_range = StructBuilder::new()
            .field(0, &1u16)
            .field(1, &256u16)
            .build();
        assert!(matches!(
            SceneRequest::from_tlv(&out_of_range),
            Err(DecodeError::OutOfRange { value: 256, .. })
        ));
    }
}
