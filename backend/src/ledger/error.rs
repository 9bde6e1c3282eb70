use crate::error::RepositoryError;
use crate::fees::FeeError;
use crate::models::SpaceId;
use serde::Serialize;
use thiserror::Error;

/// Broad failure classes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Transient,
}

/// Why a ledger operation was refused. A refused operation changes nothing.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Space {0} not found")]
    SpaceNotFound(SpaceId),

    #[error("Space {0} is already occupied")]
    SpaceOccupied(SpaceId),

    #[error("Plate {0} is already parked")]
    DuplicateOpenRecord(String),

    #[error("Space {0} is not occupied")]
    SpaceNotOccupied(SpaceId),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid interval: {0}")]
    InvalidInterval(#[from] FeeError),

    #[error("Invalid plate number: {0:?}")]
    InvalidPlate(String),

    #[error("No free space for plate {0}")]
    FacilityFull(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] RepositoryError),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Storage(RepositoryError::from(err))
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::SpaceNotFound(_) | LedgerError::RecordNotFound(_) => ErrorKind::NotFound,
            LedgerError::SpaceOccupied(_)
            | LedgerError::DuplicateOpenRecord(_)
            | LedgerError::SpaceNotOccupied(_)
            | LedgerError::FacilityFull(_) => ErrorKind::Conflict,
            LedgerError::InvalidInterval(_) | LedgerError::InvalidPlate(_) => {
                ErrorKind::InvalidInput
            }
            LedgerError::Storage(_) => ErrorKind::Transient,
        }
    }
}
