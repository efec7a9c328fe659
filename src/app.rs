use serde::Serialize;
use tracing::{info, warn};

use crate::domain::{MapAnnotationId, WellId};
use crate::error::AnnotateError;
use crate::loader::{PlateRecord, PlateTable};
use crate::omero::OmeroClient;

#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    pub force: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotateResult {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Runs the per-row pipeline: resolve plate, resolve well, then create,
/// update or skip the namespaced map annotation. Any lookup failure aborts
/// the whole run; an existing annotation without `force` is the only
/// condition the run continues past.
pub struct App<C: OmeroClient> {
    client: C,
    namespace: String,
}

impl<C: OmeroClient> App<C> {
    pub fn new(client: C, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn annotate(
        &self,
        table: &PlateTable,
        options: &AnnotateOptions,
    ) -> Result<AnnotateResult, AnnotateError> {
        let mut result = AnnotateResult::default();
        for record in &table.records {
            self.annotate_record(record, options, &mut result)?;
        }
        Ok(result)
    }

    fn annotate_record(
        &self,
        record: &PlateRecord,
        options: &AnnotateOptions,
        result: &mut AnnotateResult,
    ) -> Result<(), AnnotateError> {
        let plate = self.client.resolve_plate(&record.plate_name)?;
        let well = self.client.resolve_well(plate, record.position)?;

        let existing = self.client.map_annotation_ids(well, &self.namespace)?;
        match existing.as_slice() {
            [] => {
                let id = self
                    .client
                    .create_map_annotation(well, &self.namespace, &record.payload)?;
                info!("new MapAnnotation:{id} posted to Well:{well}");
                result.created += 1;
            }
            [id] => {
                warn!(
                    "MapAnnotation with namespace:{} already exists for well:{well}",
                    self.namespace
                );
                if options.force {
                    self.force_update(well, *id, record, result)?;
                } else {
                    warn!("skipping MapAnnotation for well:{well}");
                    result.skipped += 1;
                }
            }
            many => {
                return Err(AnnotateError::AnnotationConflict {
                    well: well.as_i64(),
                    count: many.len(),
                });
            }
        }
        Ok(())
    }

    fn force_update(
        &self,
        well: WellId,
        id: MapAnnotationId,
        record: &PlateRecord,
        result: &mut AnnotateResult,
    ) -> Result<(), AnnotateError> {
        warn!("forcing update of MapAnnotation:{id} for well:{well}");
        self.client.update_map_annotation(id, &record.payload)?;
        result.updated += 1;
        Ok(())
    }
}
