mod config;
mod error;
mod models;
mod store;

pub use config::RestConfig;
pub use store::PostgrestTeamStore;

use crate::dao::storage::StorageError;
use error::RestDaoError;

impl From<RestDaoError> for StorageError {
    fn from(err: RestDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
