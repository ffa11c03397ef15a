use chrono::NaiveDate;

/// Failure of a single call to one of the remote services.
///
/// Every collaborator call is attempted once; callers decide whether the
/// failure costs them a meal, a date, or the whole run.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} responded with {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("{url} rejected the request: {message}")]
    Rejected { url: String, message: String },
}

impl RemoteError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("could not fetch order {order_id}: {source}")]
    OrderUnavailable {
        order_id: String,
        #[source]
        source: RemoteError,
    },

    #[error("could not resolve product '{name}': {source}")]
    ProductResolutionFailed {
        name: String,
        #[source]
        source: RemoteError,
    },

    #[error("could not read the diet plan for {date}: {source}")]
    PlanUnavailable {
        date: NaiveDate,
        #[source]
        source: RemoteError,
    },

    #[error("diet plan submission for {date} failed: {source}")]
    MergeSubmissionFailed {
        date: NaiveDate,
        #[source]
        source: RemoteError,
    },
}
