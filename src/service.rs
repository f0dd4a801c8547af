//! Request boundary
//!
//! Decodes a request envelope, enforces the configured ceilings, invokes
//! exactly one engine operation and maps the outcome to an accepted,
//! rejected or failed response.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{Config, DEFAULT_PREVIEW_LIMIT};
use crate::error::EngineError;
use crate::expr::create_derived_column;
use crate::model::{Table, Value};
use crate::ops::{
    convert_type, count_nulls, preview, remove_nulls, summary, NullMethod, OperationResult,
    TargetType,
};

/// Message returned for failures outside the invalid-input category
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

fn default_preview_limit() -> usize {
    DEFAULT_PREVIEW_LIMIT
}

/// A request envelope, tagged by `operation`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum Request {
    RemoveNulls {
        data: Table,
        #[serde(default)]
        column: Option<String>,
        #[serde(default)]
        method: NullMethod,
        #[serde(default, alias = "customValue")]
        custom_value: Option<Value>,
    },
    Preview {
        data: Table,
        #[serde(default = "default_preview_limit")]
        limit: usize,
    },
    Summary {
        data: Table,
        #[serde(default)]
        column: Option<String>,
    },
    ConvertType {
        data: Table,
        column: String,
        #[serde(alias = "targetType")]
        target_type: TargetType,
    },
    CreateDerivedColumn {
        data: Table,
        #[serde(alias = "newColumnName")]
        new_column_name: String,
        expression: String,
    },
    CountNulls {
        data: Table,
        #[serde(default)]
        column: Option<String>,
    },
}

impl Request {
    /// Operation name as used in the envelope
    pub fn operation(&self) -> &'static str {
        match self {
            Request::RemoveNulls { .. } => "remove-nulls",
            Request::Preview { .. } => "preview",
            Request::Summary { .. } => "summary",
            Request::ConvertType { .. } => "convert-type",
            Request::CreateDerivedColumn { .. } => "create-derived-column",
            Request::CountNulls { .. } => "count-nulls",
        }
    }

    /// The table carried by the request
    pub fn data(&self) -> &Table {
        match self {
            Request::RemoveNulls { data, .. }
            | Request::Preview { data, .. }
            | Request::Summary { data, .. }
            | Request::ConvertType { data, .. }
            | Request::CreateDerivedColumn { data, .. }
            | Request::CountNulls { data, .. } => data,
        }
    }
}

/// Outcome of handling one request
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    /// The operation ran; result and diagnostics are relayed verbatim
    Accepted { result: OperationResult },
    /// The request cannot be processed as given
    Rejected { message: String },
    /// Something unexpected went wrong; details stay in the logs
    Failed { message: String },
}

impl Response {
    fn rejected(message: impl Into<String>) -> Self {
        Response::Rejected {
            message: message.into(),
        }
    }

    fn failed() -> Self {
        Response::Failed {
            message: INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Response::Accepted { .. })
    }
}

/// Liveness payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
}

/// Stateless dispatcher in front of the engine
#[derive(Debug, Clone, Default)]
pub struct Service {
    config: Config,
}

impl Service {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            service: "data-ops",
        }
    }

    /// Decode a JSON envelope and handle it
    pub fn handle_json(&self, body: &str) -> Response {
        match serde_json::from_str::<Request>(body) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!(error = %e, "rejected malformed request");
                Response::rejected(format!("Invalid request: {}", e))
            }
        }
    }

    /// Run one request through the engine
    pub fn handle(&self, request: Request) -> Response {
        let operation = request.operation();
        let rows = request.data().row_count();
        debug!(operation, rows, "handling request");

        if rows > self.config.max_rows {
            warn!(operation, rows, max_rows = self.config.max_rows, "row limit exceeded");
            return Response::rejected(format!(
                "Data exceeds maximum rows limit of {}",
                self.config.max_rows
            ));
        }

        match self.dispatch(request) {
            Ok(result) => self.accept(result),
            Err(e) => {
                warn!(operation, error = %e, "rejected request");
                Response::rejected(e.to_string())
            }
        }
    }

    fn dispatch(&self, request: Request) -> Result<OperationResult, EngineError> {
        let result = match request {
            Request::RemoveNulls {
                data,
                column,
                method,
                custom_value,
            } => OperationResult::RemoveNulls(remove_nulls(
                &data,
                column.as_deref(),
                method,
                custom_value.as_ref(),
            )?),
            Request::Preview { data, limit } => {
                if limit == 0 {
                    return Err(EngineError::invalid("limit must be at least 1"));
                }
                let limit = limit.min(self.config.max_preview_rows);
                OperationResult::Preview(preview(&data, limit))
            }
            Request::Summary { data, column } => {
                OperationResult::Summary(summary(&data, column.as_deref())?)
            }
            Request::ConvertType {
                data,
                column,
                target_type,
            } => OperationResult::ConvertType(convert_type(
                &data,
                &column,
                target_type,
                self.config.percentage_policy,
            )?),
            Request::CreateDerivedColumn {
                data,
                new_column_name,
                expression,
            } => OperationResult::DerivedColumn(create_derived_column(
                &data,
                &new_column_name,
                &expression,
            )?),
            Request::CountNulls { data, column } => {
                OperationResult::CountNulls(count_nulls(&data, column.as_deref())?)
            }
        };
        Ok(result)
    }

    fn accept(&self, result: OperationResult) -> Response {
        let operation = result.operation();
        match &result {
            // Any row-level failure rejects the whole derived-column request
            OperationResult::DerivedColumn(derived) if !derived.is_clean() => {
                let message = derived
                    .errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!(operation, errors = derived.errors.len(), "derived column had row errors");
                return Response::rejected(message);
            }
            OperationResult::RemoveNulls(r) => {
                info!(operation, method = %r.method, affected = r.affected_count, "completed")
            }
            OperationResult::ConvertType(r) => info!(
                operation,
                succeeded = r.success_count,
                failed = r.error_count,
                "completed"
            ),
            _ => info!(operation, rows = result.data().map(Table::row_count), "completed"),
        }

        if result.has_non_finite() {
            error!(operation, "result contains a non-finite number");
            return Response::failed();
        }
        Response::Accepted { result }
    }
}
