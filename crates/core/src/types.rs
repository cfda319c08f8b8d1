/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Monetary amounts are integer cents. Winnings are split with floor
/// division, so cents keep the arithmetic exact (see `wallet`).
pub type Cents = i64;
