pub mod database;
pub mod error;
pub mod schema;
pub mod seed;

pub use database::{
    format_timestamp, LoginRecord, NewQuota, NewUser, QuotaDatabase, QuotaRecord, SummaryRecord, UserRecord,
};
pub use error::StorageError;
pub use seed::seed_demo_data;

pub const QUOTA_DB_FILENAME: &str = "quotas.db";
