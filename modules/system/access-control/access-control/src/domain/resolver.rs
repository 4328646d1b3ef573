//! Ownership operand resolution.

use std::sync::Arc;

use access_control_sdk::{
    LookupError, ModelLookup, OperandError, OperandSource, OperandSpec, PointQuery, RecordLookup,
    RequestFields, canonical_text,
};
use serde_json::Value;
use tracing::{debug, error};

/// Pair of resolved operands; `None` when the value is absent.
pub type ResolvedOperands = (Option<Value>, Option<Value>);

/// Resolves the two values compared by an ownership check.
///
/// The first operand is always read from the request. The second is read from
/// the request (`OperandSource::Direct`) or fetched with exactly one point
/// lookup (`OperandSource::Model`).
#[derive(Clone, Default)]
pub struct OperandResolver {
    lookup: Option<Arc<dyn RecordLookup>>,
}

impl OperandResolver {
    #[must_use]
    pub fn new(lookup: Option<Arc<dyn RecordLookup>>) -> Self {
        Self { lookup }
    }

    /// # Errors
    ///
    /// - [`OperandError::NotFound`] if the model lookup matched no row
    /// - [`OperandError::Persistence`] if the lookup failed or none is configured
    pub async fn resolve<R>(
        &self,
        first: &OperandSpec,
        second: &OperandSpec,
        request: &R,
    ) -> Result<ResolvedOperands, OperandError>
    where
        R: RequestFields + ?Sized,
    {
        let first_value = request.field(first.source(), first.key());

        let second_value = match second.via() {
            OperandSource::Direct => request.field(second.source(), second.key()),
            OperandSource::Model(lookup) => {
                let key_value = request.field(second.source(), second.key());
                self.fetch(lookup, key_value).await?
            }
        };

        Ok((first_value, second_value))
    }

    async fn fetch(
        &self,
        lookup: &ModelLookup,
        key_value: Option<Value>,
    ) -> Result<Option<Value>, OperandError> {
        let Some(records) = &self.lookup else {
            error!(
                table = lookup.model_name(),
                "Model-backed operand requested but no record lookup is configured"
            );
            return Err(LookupError::Internal("no record lookup configured".to_owned()).into());
        };

        let query = PointQuery::new(lookup, key_value);
        let row = records.find_one(&query).await.inspect_err(|e| {
            error!(table = %query.table, key_column = %query.key_column, "Record lookup failed: {e}");
        })?;

        let Some(mut row) = row else {
            debug!(table = %query.table, key_column = %query.key_column, "No record matched lookup");
            return Err(OperandError::NotFound {
                table: query.table,
                key_column: query.key_column,
                key_value: query
                    .key_value
                    .as_ref()
                    .and_then(canonical_text)
                    .unwrap_or_else(|| "null".to_owned()),
            });
        };

        Ok(row.remove(lookup.op_key()))
    }
}

impl std::fmt::Debug for OperandResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperandResolver")
            .field("has_lookup", &self.lookup.is_some())
            .finish()
    }
}
