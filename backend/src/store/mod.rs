//! Persistence for data sources and footprints.
//!
//! The exchange core depends on the two traits only. [`SqliteStore`] backs
//! the running server, [`MemoryStore`] backs tests. Both serialize footprint
//! writes behind one lock, so a version comparison and the write it guards
//! can never interleave with another write.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use common::model::datasource::DataSource;
use common::model::footprint::{Footprint, FootprintId};
use serde::Serialize;

pub trait DataSourceStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<DataSource>>;

    fn list(&self) -> Result<Vec<DataSource>>;

    /// Inserts or replaces the record keyed by `data_source_id`.
    fn put(&self, source: &DataSource) -> Result<()>;

    /// Returns whether a record was removed.
    fn delete(&self, id: &str) -> Result<bool>;
}

/// Result of a version-guarded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum PutOutcome {
    Inserted { id: FootprintId },
    Replaced { id: FootprintId },
    /// A newer version is already stored; nothing was written.
    #[serde(rename_all = "camelCase")]
    Stale {
        id: FootprintId,
        stored_version: u32,
    },
}

pub trait FootprintStore: Send + Sync {
    fn get(&self, id: FootprintId) -> Result<Option<Footprint>>;

    /// All footprints, or only those fetched from `data_source_id`.
    fn list(&self, data_source_id: Option<&str>) -> Result<Vec<Footprint>>;

    fn find_by_data_id(&self, data_source_id: &str, data_id: &str) -> Result<Option<Footprint>>;

    /// Stores a new record under a freshly assigned key and returns it with
    /// `id` set.
    fn insert(&self, footprint: Footprint) -> Result<Footprint>;

    /// Overwrites the record stored under `footprint.id`.
    fn update(&self, footprint: &Footprint) -> Result<()>;

    /// Writes a partner record keyed by `(dataSourceId, dataId)`. A lower
    /// version than the stored one is discarded; equal or higher replaces
    /// the whole record and keeps its local key.
    fn put_if_newer(&self, footprint: Footprint) -> Result<PutOutcome>;

    fn delete(&self, id: FootprintId) -> Result<bool>;
}

#[cfg(test)]
pub(crate) mod tests {
    //! Behaviour shared by every store implementation.

    use super::*;
    use common::model::datasource::{
        ActionKind, Credentials, DataSourceType, Endpoint, Secret,
    };
    use common::model::footprint::FootprintStatus;

    pub(crate) fn footprint(data_id: &str, version: u32) -> Footprint {
        Footprint {
            id: None,
            data_id: data_id.to_string(),
            version,
            product_footprint_id: Some(format!("pf-{data_id}")),
            data_source_id: Some("ds-1".to_string()),
            status: FootprintStatus::Active,
            status_comment: None,
            validity_period_start: None,
            validity_period_end: None,
            company_name: "Acme".to_string(),
            company_ids: Vec::new(),
            product_description: format!("product {data_id} v{version}"),
            product_ids: Vec::new(),
            product_category_cpc: None,
            product_name_company: None,
            comment: None,
            declared_unit: Some("kilogram".to_string()),
            unitary_product_amount: None,
            pcf_excluding_biogenic: None,
            pcf_including_biogenic: None,
            fossil_ghg_emissions: None,
            biogenic_carbon_content: None,
            fossil_carbon_content: None,
            cross_sectoral_standards: Vec::new(),
            ipcc_characterization_factors_sources: Vec::new(),
            data_quality_rating: None,
            assurance: None,
            breakdown: Vec::new(),
        }
    }

    pub(crate) fn data_source(id: &str) -> DataSource {
        DataSource {
            data_source_id: id.to_string(),
            data_source_name: format!("Partner {id}"),
            source_type: DataSourceType::Pathfinder,
            credentials: Credentials {
                username: "client".to_string(),
                secret: Secret::new("s3cret"),
            },
            endpoints: vec![Endpoint {
                action: ActionKind::Authenticate,
                url: format!("https://{id}.example/auth/token"),
            }],
        }
    }

    pub(crate) fn exercise_data_sources(store: &dyn DataSourceStore) {
        assert!(store.get("ds-1").unwrap().is_none());
        store.put(&data_source("ds-1")).unwrap();
        store.put(&data_source("ds-2")).unwrap();

        let mut updated = data_source("ds-1");
        updated.data_source_name = "Renamed".to_string();
        store.put(&updated).unwrap();

        let fetched = store.get("ds-1").unwrap().unwrap();
        assert_eq!(fetched.data_source_name, "Renamed");
        assert_eq!(fetched.credentials.secret.expose(), "s3cret");
        assert_eq!(store.list().unwrap().len(), 2);

        assert!(store.delete("ds-1").unwrap());
        assert!(!store.delete("ds-1").unwrap());
        assert!(store.get("ds-1").unwrap().is_none());
    }

    pub(crate) fn exercise_versioned_writes(store: &dyn FootprintStore) {
        let first = store.put_if_newer(footprint("coil", 2)).unwrap();
        let PutOutcome::Inserted { id } = first else {
            panic!("expected insert, got {first:?}");
        };

        assert_eq!(
            store.put_if_newer(footprint("coil", 1)).unwrap(),
            PutOutcome::Stale {
                id,
                stored_version: 2
            }
        );
        assert_eq!(store.get(id).unwrap().unwrap().version, 2);

        assert_eq!(
            store.put_if_newer(footprint("coil", 3)).unwrap(),
            PutOutcome::Replaced { id }
        );
        let stored = store.find_by_data_id("ds-1", "coil").unwrap().unwrap();
        assert_eq!(stored.version, 3);
        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.product_description, "product coil v3");

        assert!(store.find_by_data_id("ds-2", "coil").unwrap().is_none());
    }

    pub(crate) fn exercise_local_records(store: &dyn FootprintStore) {
        let mut local = footprint("draft", 1);
        local.data_source_id = None;
        local.product_footprint_id = None;
        let saved = store.insert(local).unwrap();
        let id = saved.id.unwrap();

        let mut edited = saved.clone();
        edited.comment = Some("checked".to_string());
        store.update(&edited).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().comment.as_deref(), Some("checked"));

        store.put_if_newer(footprint("coil", 1)).unwrap();
        assert_eq!(store.list(None).unwrap().len(), 2);
        assert_eq!(store.list(Some("ds-1")).unwrap().len(), 1);

        assert!(store.delete(id).unwrap());
        assert!(store.get(id).unwrap().is_none());

        let mut missing = footprint("ghost", 1);
        missing.id = Some(9_999);
        assert!(store.update(&missing).is_err());
    }
}
