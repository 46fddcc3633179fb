use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A candidate profile. Profiles are the scope boundary: fingerprints and
/// notification state are tracked independently per profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}
