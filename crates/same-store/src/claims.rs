//! Advisory read/write claims, letting cooperating agents avoid stepping on
//! each other's edits without an actual filesystem lock.

use crate::error::StoreError;
use crate::pool::Store;
use rusqlite::params;
use same_core::model::{Claim, ClaimType};

fn claim_type_str(ct: ClaimType) -> &'static str {
    match ct {
        ClaimType::Read => "read",
        ClaimType::Write => "write",
    }
}

fn parse_claim_type(s: &str) -> ClaimType {
    match s {
        "write" => ClaimType::Write,
        _ => ClaimType::Read,
    }
}

pub fn upsert(store: &Store, claim: &Claim) -> Result<(), StoreError> {
    store.with_connection_mut(|conn| {
        conn.execute(
            "INSERT INTO claims (path, agent, claim_type, claimed_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(path, agent) DO UPDATE SET
                claim_type = excluded.claim_type,
                claimed_at = excluded.claimed_at,
                expires_at = excluded.expires_at",
            params![
                claim.path,
                claim.agent,
                claim_type_str(claim.claim_type),
                claim.claimed_at,
                claim.expires_at,
            ],
        )?;
        Ok(())
    })
}

pub fn release(store: &Store, path: &str, agent: &str) -> Result<bool, StoreError> {
    store.with_connection_mut(|conn| {
        Ok(conn.execute(
            "DELETE FROM claims WHERE path = ?1 AND agent = ?2",
            params![path, agent],
        )? > 0)
    })
}

/// Active (non-expired) claims on `path`, for conflict detection before a
/// write.
pub fn active_for_path(store: &Store, path: &str, now: f64) -> Result<Vec<Claim>, StoreError> {
    store.with_connection(|conn| {
        let mut stmt = conn.prepare(
            "SELECT path, agent, claim_type, claimed_at, expires_at FROM claims
             WHERE path = ?1 AND expires_at > ?2",
        )?;
        let rows = stmt
            .query_map(params![path, now], |row| {
                Ok(Claim {
                    path: row.get(0)?,
                    agent: row.get(1)?,
                    claim_type: parse_claim_type(&row.get::<_, String>(2)?),
                    claimed_at: row.get(3)?,
                    expires_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Delete every claim whose `expires_at` is at or before `now`. Returns the
/// number of rows removed.
pub fn sweep_expired(store: &Store, now: f64) -> Result<usize, StoreError> {
    store.with_connection_mut(|conn| {
        Ok(conn.execute("DELETE FROM claims WHERE expires_at <= ?1", params![now])?)
    })
}
