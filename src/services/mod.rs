pub mod clock;
pub mod crypto;
pub mod email;
pub mod reservation;
pub mod scheduling;
pub mod tmdb;

use sqlx::PgConnection;

// Транзакционная advisory-блокировка: ключ собирается из пространства имён
// и идентификатора сущности. Блокировка отпускается вместе с транзакцией,
// поэтому явного unlock нет.
pub(crate) async fn acquire_xact_lock(
    conn: &mut PgConnection,
    namespace: i64,
    key: i64,
) -> Result<(), sqlx::Error> {
    let lock_key = (namespace << 32) | (key & 0xFFFF_FFFF);
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(lock_key)
        .execute(conn)
        .await?;
    Ok(())
}
