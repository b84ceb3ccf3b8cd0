//! Conversions from external infrastructure errors into domain errors.

use cohort_domain::CohortError;
use r2d2::Error as PoolError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CohortError);

impl From<InfraError> for CohortError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CohortError> for InfraError {
    fn from(value: CohortError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCohortError {
    fn into_cohort(self) -> CohortError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CohortError */
/* -------------------------------------------------------------------------- */

impl IntoCohortError for SqlError {
    fn into_cohort(self) -> CohortError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        CohortError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        CohortError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067) => {
                        CohortError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        CohortError::Database("foreign key constraint violation".into())
                    }
                    _ => CohortError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => CohortError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                CohortError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                CohortError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(_) => CohortError::Database("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidParameterName(parameter_name) => {
                CohortError::Database(format!("invalid parameter name: {parameter_name}"))
            }
            RE::InvalidPath(path) => {
                CohortError::Database(format!("invalid database path: {}", path.to_string_lossy()))
            }
            RE::InvalidQuery => CohortError::Database("invalid SQL query".into()),
            other => CohortError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_cohort())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → CohortError */
/* -------------------------------------------------------------------------- */

impl IntoCohortError for PoolError {
    fn into_cohort(self) -> CohortError {
        CohortError::Database(format!("connection pool: {self}"))
    }
}

impl From<PoolError> for InfraError {
    fn from(value: PoolError) -> Self {
        InfraError(value.into_cohort())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CohortError */
/* -------------------------------------------------------------------------- */

impl IntoCohortError for HttpError {
    fn into_cohort(self) -> CohortError {
        if self.is_timeout() {
            return CohortError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CohortError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                // Rejected relay credentials are a deployment problem.
                401 | 403 => CohortError::Config(message),
                404 => CohortError::NotFound(message),
                429 => CohortError::Network(message),
                400..=499 => CohortError::InvalidInput(message),
                _ => CohortError::Network(message),
            };
        }

        CohortError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_cohort())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use rusqlite::Error as SqlError;
    use tokio::runtime::Runtime;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: CohortError = InfraError::from(err).into();
        match mapped {
            CohortError::Database(msg) => {
                assert!(msg.contains("busy") || msg.contains("locked"));
            }
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn sqlite_no_rows_maps_to_not_found() {
        let mapped: CohortError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        match mapped {
            CohortError::NotFound(msg) => assert!(msg.contains("no rows")),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn sqlite_unique_violation_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::ConstraintViolation, extended_code: 2067 },
            Some("UNIQUE constraint failed: notifications.meeting_id".into()),
        );

        let mapped: CohortError = InfraError::from(err).into();
        match mapped {
            CohortError::Database(msg) => assert!(msg.contains("unique")),
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn http_status_401_maps_to_config_error() {
        Runtime::new().unwrap().block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
                .mount(&server)
                .await;

            let client = Client::builder().no_proxy().build().unwrap();
            let error =
                client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

            let mapped: CohortError = InfraError::from(error).into();
            match mapped {
                CohortError::Config(msg) => assert!(msg.contains("401")),
                other => panic!("expected config error, got {:?}", other),
            }
        });
    }

    #[test]
    fn http_status_500_maps_to_network_error() {
        Runtime::new().unwrap().block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(StatusCode::INTERNAL_SERVER_ERROR))
                .mount(&server)
                .await;

            let client = Client::builder().no_proxy().build().unwrap();
            let error =
                client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

            let mapped: CohortError = InfraError::from(error).into();
            match mapped {
                CohortError::Network(msg) => assert!(msg.contains("500")),
                other => panic!("expected network error, got {:?}", other),
            }
        });
    }
}
