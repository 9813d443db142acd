use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::envelope::Envelope;
use crate::query::{QueryError, QueryGateway};

pub type AppState = Arc<QueryGateway>;

/// Query used to look up every outgoing binding of a property vertex.
pub fn property_query(id: &str) -> String {
    format!(r#"g.V("/properties/{id}").Tag("source").Out(null, "predicate").All()"#)
}

/// HTTP status reported for each kind of query failure.
pub fn error_status(err: &QueryError) -> StatusCode {
    match err {
        QueryError::Parse(_) | QueryError::Execution(_) => StatusCode::BAD_REQUEST,
        QueryError::Incomplete => StatusCode::INTERNAL_SERVER_ERROR,
        QueryError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// `GET /api/v1/properties/:id`
pub async fn find_property(
    State(gateway): State<AppState>,
    Path(vars): Path<BTreeMap<String, String>>,
) -> Response {
    let id = vars.get("id").map(String::as_str).unwrap_or_default();
    let query = property_query(id);

    match gateway.run(&query).await {
        Ok(output) => Envelope::success(vars, output).respond(StatusCode::OK),
        Err(err) => {
            log::debug!("Query {:?} failed: {}", query, err);
            let status = error_status(&err);
            Envelope::failure(vars, err.to_string()).respond(status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{parse, ParseOutcome};
    use std::time::Duration;

    #[test]
    fn generated_query_parses_for_plain_ids() {
        for id in ["42", "abc-123", "a b", "ünïcode"] {
            assert!(
                matches!(parse(&property_query(id)), ParseOutcome::Parsed(_)),
                "{id}"
            );
        }
    }

    #[test]
    fn quote_in_id_breaks_the_query() {
        assert!(matches!(
            parse(&property_query("4\"2")),
            ParseOutcome::ParseFail(_)
        ));
    }

    #[test]
    fn statuses() {
        assert_eq!(error_status(&QueryError::Parse("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(error_status(&QueryError::Execution("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(error_status(&QueryError::Incomplete), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error_status(&QueryError::Timeout(Duration::from_secs(1))),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
