use access_control_sdk::{LookupError, PointQuery, Record, RecordLookup};
use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Query};
use sea_orm::{ConnectionTrait, DatabaseConnection, FromQueryResult};
use serde_json::Value as JsonValue;

/// [`RecordLookup`] over a sea-orm connection.
///
/// Table and column names come from check point configuration and are quoted
/// as identifiers; the key value is always bound as a parameter.
#[derive(Debug, Clone)]
pub struct SeaOrmRecordLookup {
    db: DatabaseConnection,
}

impl SeaOrmRecordLookup {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Bind a request value as a query parameter.
///
/// Absent, null and structured values bind `NULL`, which matches no row.
fn bind_value(value: Option<&JsonValue>) -> sea_orm::Value {
    match value {
        Some(JsonValue::String(s)) => s.clone().into(),
        Some(JsonValue::Bool(b)) => (*b).into(),
        Some(JsonValue::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                u.into()
            } else {
                n.as_f64().into()
            }
        }
        Some(JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_)) | None => {
            sea_orm::Value::String(None)
        }
    }
}

#[async_trait]
impl RecordLookup for SeaOrmRecordLookup {
    async fn find_one(&self, query: &PointQuery) -> Result<Option<Record>, LookupError> {
        let select = Query::select()
            .column(Alias::new(query.key_column.as_str()))
            .column(Alias::new(query.value_column.as_str()))
            .from(Alias::new(query.table.as_str()))
            .and_where(
                Expr::col(Alias::new(query.key_column.as_str()))
                    .eq(bind_value(query.key_value.as_ref())),
            )
            .limit(1)
            .to_owned();

        let stmt = self.db.get_database_backend().build(&select);
        let Some(row) = self.db.query_one(stmt).await.map_err(LookupError::backend)? else {
            return Ok(None);
        };

        match JsonValue::from_query_result(&row, "").map_err(LookupError::backend)? {
            JsonValue::Object(record) => Ok(Some(record)),
            other => Err(LookupError::Internal(format!(
                "expected a row object, got {other}"
            ))),
        }
    }
}
