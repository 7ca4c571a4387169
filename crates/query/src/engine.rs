use chrono::Utc;
use tracing::{debug, instrument, warn};

use telq_core::ApiError;
use telq_core::model::{FlatLog, FlatSpan};
use telq_core::query::{LogQuery, QueryEnvelope, SpanQuery};

use crate::client::QueryExecutor;
use crate::flatten::flatten;
use crate::kind::{Logs, RecordKind, Spans};
use crate::postfilter::{PostFilter, limit_records};
use crate::translate::{QueryPlan, plan_log_query, plan_span_query};

/// Runs log and span queries: plan, one upstream round trip, flatten,
/// post-filter, truncate, wrap.
///
/// Holds no per-call state, so one engine serves concurrent queries.
#[derive(Debug, Clone)]
pub struct QueryEngine<E> {
    executor: E,
}

impl<E: QueryExecutor> QueryEngine<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    #[instrument(skip_all)]
    pub async fn query_logs(&self, query: &LogQuery) -> Result<QueryEnvelope<FlatLog>, ApiError> {
        self.run::<Logs>(plan_log_query(query, Utc::now())).await
    }

    #[instrument(skip_all)]
    pub async fn query_spans(
        &self,
        query: &SpanQuery,
    ) -> Result<QueryEnvelope<FlatSpan>, ApiError> {
        self.run::<Spans>(plan_span_query(query, Utc::now())).await
    }

    pub async fn run<K: RecordKind>(
        &self,
        plan: QueryPlan<K::Post>,
    ) -> Result<QueryEnvelope<K::Flat>, ApiError> {
        let request = plan.request();
        debug!(
            signal = K::SIGNAL.as_str(),
            path = K::SIGNAL.path(),
            filters = request.filter.len(),
            page_size = request.pagination.limit,
            "querying upstream"
        );

        let payload = match self.executor.execute(K::SIGNAL, &request).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(status = err.status_code, detail = %err.detail, "upstream query failed");
                return Err(err);
            }
        };

        let mut records = flatten::<K>(&payload);
        let fetched = records.len();
        plan.post.apply(&mut records);
        limit_records(&mut records, plan.limit);
        debug!(fetched, kept = records.len(), "query complete");

        Ok(QueryEnvelope::new(records, plan.echo()))
    }
}
