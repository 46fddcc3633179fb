use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::profile::ProfileRow;

/// Creates a profile and returns the stored row.
pub async fn create_profile(
    pool: &SqlitePool,
    name: &str,
    email: &str,
) -> sqlx::Result<ProfileRow> {
    let result = sqlx::query(
        "INSERT INTO profiles (name, email, enabled, created_at) VALUES (?, ?, 1, ?)",
    )
    .bind(name)
    .bind(email)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(pool)
        .await
}

pub async fn get_profile(pool: &SqlitePool, profile_id: i64) -> sqlx::Result<Option<ProfileRow>> {
    sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = ?")
        .bind(profile_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_profiles(pool: &SqlitePool) -> sqlx::Result<Vec<ProfileRow>> {
    sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}
