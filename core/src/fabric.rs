//! Fabrics and the data clusters keep per fabric.
//!
//! Each fabric owns a storage context (`fabric-<index>`); cluster data is
//! scoped one level further down by cluster id, so two fabrics never see each
//! other's scene or group tables.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    storage::{StorageContext, StorageError},
    ClusterId, NodeId,
};

/// Index of a fabric in the node's fabric table (7.5.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FabricIndex(pub u8);

pub struct Fabric {
    pub index: FabricIndex,
    pub fabric_id: u64,
    pub node_id: NodeId,
    pub vendor_id: u16,
    pub label: String,
    storage: StorageContext,
}

impl Fabric {
    pub fn new(
        index: FabricIndex,
        fabric_id: u64,
        node_id: NodeId,
        vendor_id: u16,
        storage: &StorageContext,
    ) -> Result<Self, StorageError> {
        let storage = storage.create_context(&format!("fabric-{}", index.0))?;
        Ok(Self {
            index,
            fabric_id,
            node_id,
            vendor_id,
            label: String::new(),
            storage,
        })
    }

    fn cluster_context(&self, cluster: ClusterId) -> Result<StorageContext, StorageError> {
        self.storage.create_context(&format!("cluster-{cluster}"))
    }

    pub fn scoped_cluster_data<T: DeserializeOwned>(
        &self,
        cluster: ClusterId,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        self.cluster_context(cluster)?.get(key)
    }

    pub fn set_scoped_cluster_data<T: Serialize + ?Sized>(
        &mut self,
        cluster: ClusterId,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        self.cluster_context(cluster)?.set(key, value)
    }

    /// Flush scoped cluster data.
    pub fn persist(&self) -> Result<(), StorageError> {
        self.storage.persist()
    }
}

#[derive(Default)]
pub struct FabricTable {
    fabrics: BTreeMap<FabricIndex, Fabric>,
}

impl FabricTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fabric: Fabric) {
        self.fabrics.insert(fabric.index, fabric);
    }

    pub fn get(&self, index: FabricIndex) -> Option<&Fabric> {
        self.fabrics.get(&index)
    }

    pub fn get_mut(&mut self, index: FabricIndex) -> Option<&mut Fabric> {
        self.fabrics.get_mut(&index)
    }

    pub fn remove(&mut self, index: FabricIndex) -> Option<Fabric> {
        self.fabrics.remove(&index)
    }

    pub fn len(&self) -> usize {
        self.fabrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fabrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::MemoryStorage;

    use super::*;

    #[test]
    fn test_fabric_scoped_data_is_isolated() {
        let root = StorageContext::new(MemoryStorage::shared());
        let mut first = Fabric::new(FabricIndex(1), 0xA1, 0x11, 0xFFF1, &root).unwrap();
        let second = Fabric::new(FabricIndex(2), 0xB2, 0x22, 0xFFF1, &root).unwrap();

        first.set_scoped_cluster_data(5, "1", &vec![1u8, 2, 3]).unwrap();
        assert_eq!(
            first.scoped_cluster_data::<Vec<u8>>(5, "1").unwrap(),
            Some(vec![1, 2, 3])
        );
        assert_eq!(second.scoped_cluster_data::<Vec<u8>>(5, "1").unwrap(), None);
        assert_eq!(first.scoped_cluster_data::<Vec<u8>>(4, "1").unwrap(), None);
    }
}
