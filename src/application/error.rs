use thiserror::Error;

use crate::client::ClientError;
use crate::domain::PayoutId;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Failed to list payouts: {0}")]
    ListPayouts(#[source] ClientError),

    #[error("Failed to fetch payout {payout_id}: {source}")]
    Fetch {
        payout_id: PayoutId,
        #[source]
        source: ClientError,
    },
}

impl AppError {
    pub fn fetch(payout_id: &str, source: ClientError) -> Self {
        AppError::Fetch {
            payout_id: payout_id.to_string(),
            source,
        }
    }
}
