use crate::error::Result;
use crate::store::{FootprintStore, PutOutcome};
use common::model::breakdown::{check_breakdown, BreakdownIssue};
use common::model::footprint::Footprint;
use common::model::quantity::Quantity;
use log::{debug, warn};

/// What happened to one partner record on its way into the store.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub outcome: PutOutcome,
    pub issues: Vec<BreakdownIssue>,
}

/// Stores a partner footprint under last-writer-by-version rules. Breakdown
/// inconsistencies are logged and returned; they never prevent the write.
pub fn reconcile(
    store: &dyn FootprintStore,
    footprint: Footprint,
    tolerance: Quantity,
) -> Result<Reconciled> {
    let issues = check_breakdown(&footprint, tolerance);
    let label = format!(
        "{}/{} v{}",
        footprint.data_source_id.as_deref().unwrap_or("local"),
        footprint.data_id,
        footprint.version
    );
    for issue in &issues {
        warn!("Footprint {}: {}", label, issue);
    }

    let outcome = store.put_if_newer(footprint)?;
    match outcome {
        PutOutcome::Stale { stored_version, .. } => {
            debug!("Footprint {} discarded, version {} already stored", label, stored_version)
        }
        PutOutcome::Inserted { id } | PutOutcome::Replaced { id } => {
            debug!("Footprint {} stored as #{}", label, id)
        }
    }
    Ok(Reconciled { outcome, issues })
}
