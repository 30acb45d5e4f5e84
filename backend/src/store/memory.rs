use crate::error::{ExchangeError, Result};
use crate::store::{DataSourceStore, FootprintStore, PutOutcome};
use common::model::datasource::DataSource;
use common::model::footprint::{Footprint, FootprintId};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    sources: BTreeMap<String, DataSource>,
    footprints: BTreeMap<FootprintId, Footprint>,
    last_id: FootprintId,
}

impl Tables {
    fn next_id(&mut self) -> FootprintId {
        self.last_id += 1;
        self.last_id
    }

    fn find(&self, data_source_id: &str, data_id: &str) -> Option<&Footprint> {
        self.footprints.values().find(|fp| {
            fp.data_source_id.as_deref() == Some(data_source_id) && fp.data_id == data_id
        })
    }
}

/// Process-local store, used by tests and as a scratch backend.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| ExchangeError::internal("memory store lock poisoned"))
    }
}

impl DataSourceStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<DataSource>> {
        Ok(self.tables()?.sources.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<DataSource>> {
        Ok(self.tables()?.sources.values().cloned().collect())
    }

    fn put(&self, source: &DataSource) -> Result<()> {
        self.tables()?
            .sources
            .insert(source.data_source_id.clone(), source.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.tables()?.sources.remove(id).is_some())
    }
}

impl FootprintStore for MemoryStore {
    fn get(&self, id: FootprintId) -> Result<Option<Footprint>> {
        Ok(self.tables()?.footprints.get(&id).cloned())
    }

    fn list(&self, data_source_id: Option<&str>) -> Result<Vec<Footprint>> {
        Ok(self
            .tables()?
            .footprints
            .values()
            .filter(|fp| data_source_id.is_none() || fp.data_source_id.as_deref() == data_source_id)
            .cloned()
            .collect())
    }

    fn find_by_data_id(&self, data_source_id: &str, data_id: &str) -> Result<Option<Footprint>> {
        Ok(self.tables()?.find(data_source_id, data_id).cloned())
    }

    fn insert(&self, mut footprint: Footprint) -> Result<Footprint> {
        let mut tables = self.tables()?;
        let id = tables.next_id();
        footprint.id = Some(id);
        tables.footprints.insert(id, footprint.clone());
        Ok(footprint)
    }

    fn update(&self, footprint: &Footprint) -> Result<()> {
        let id = footprint
            .id
            .ok_or_else(|| ExchangeError::validation("footprint has no id"))?;
        let mut tables = self.tables()?;
        match tables.footprints.get_mut(&id) {
            Some(slot) => {
                *slot = footprint.clone();
                Ok(())
            }
            None => Err(ExchangeError::not_found(format!("footprint {}", id))),
        }
    }

    fn put_if_newer(&self, mut footprint: Footprint) -> Result<PutOutcome> {
        let data_source_id = footprint
            .data_source_id
            .clone()
            .ok_or_else(|| ExchangeError::validation("partner footprint has no dataSourceId"))?;
        let mut tables = self.tables()?;

        let existing = tables
            .find(&data_source_id, &footprint.data_id)
            .and_then(|fp| fp.id.map(|id| (id, fp.version)));

        let (id, outcome) = match existing {
            Some((id, stored_version)) if stored_version > footprint.version => {
                return Ok(PutOutcome::Stale { id, stored_version });
            }
            Some((id, _)) => (id, PutOutcome::Replaced { id }),
            None => {
                let id = tables.next_id();
                (id, PutOutcome::Inserted { id })
            }
        };
        footprint.id = Some(id);
        tables.footprints.insert(id, footprint);
        Ok(outcome)
    }

    fn delete(&self, id: FootprintId) -> Result<bool> {
        Ok(self.tables()?.footprints.remove(&id).is_some())
    }
}
