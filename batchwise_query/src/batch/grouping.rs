use batchwise_core::{Query, Request};

use super::Batch;

/// Partition a request's queries into batches by data-source id.
///
/// Batches come out in order of first appearance of their data source, and
/// queries keep their request order within a batch. Dependency edges are
/// only recorded for the query that opens a batch, and only towards RefIds
/// already grouped into another batch at that point: a query must follow
/// the queries it depends on, otherwise the edge is silently dropped.
/// Unknown RefIds are dropped the same way. Grouping never fails.
pub fn get_batches(request: &Request) -> Vec<Batch> {
    let mut batches: Vec<Batch> = Vec::new();

    for query in &request.queries {
        if let Some(batch) = find_matching_batch(query, &mut batches) {
            batch.add_query(query.clone());
            continue;
        }

        let mut batch = Batch::new(query.clone());
        for ref_id in &query.depends {
            if batches.iter().any(|existing| existing.contains(ref_id)) {
                batch.add_dependency(ref_id.clone());
            }
        }

        tracing::debug!(
            data_source_id = batch.data_source_id(),
            depends = ?batch.depends(),
            "Created batch"
        );
        batches.push(batch);
    }

    batches
}

fn find_matching_batch<'a>(query: &Query, batches: &'a mut [Batch]) -> Option<&'a mut Batch> {
    batches
        .iter_mut()
        .find(|batch| batch.data_source_id() == query.data_source.id)
}
