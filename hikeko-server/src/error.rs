use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use hikeko_api::Error as ApiError;

/// What a handler can fail with
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database and other internal failures, logged and hidden from the client
    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    /// The request itself was wrong, reported as-is
    #[error(transparent)]
    Rejected(#[from] ApiError),
}

#[cfg(not(test))]
fn internal_message(_err: &anyhow::Error) -> String {
    String::from("Internal server error, see logs for details")
}

#[cfg(test)]
fn internal_message(err: &anyhow::Error) -> String {
    format!("Internal server error: {err:?}")
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let err = match self {
            Error::Internal(err) => {
                tracing::error!(?err, "internal server error");
                ApiError::Unknown(internal_message(&err))
            }
            Error::Rejected(err) => {
                tracing::debug!(%err, "rejecting request");
                err
            }
        };
        (
            err.status_code(),
            [(header::CONTENT_TYPE, "application/json")],
            err.contents(),
        )
            .into_response()
    }
}
