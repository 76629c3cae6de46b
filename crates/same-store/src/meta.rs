//! Key-value metadata: embedding provider fingerprint, index mode, timestamps.

use crate::error::StoreError;
use crate::pool::Store;
use rusqlite::{params, OptionalExtension};
use same_core::model::meta_keys;

pub fn get(store: &Store, key: &str) -> Result<Option<String>, StoreError> {
    store.with_connection(|conn| {
        Ok(conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?)
    })
}

pub fn set(store: &Store, key: &str, value: &str) -> Result<(), StoreError> {
    store.with_connection_mut(|conn| {
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    })
}

/// Compare stored `embed_{provider,model,dim}` against the active provider.
/// Returns `Err(ProviderMismatch)` the first field that disagrees; `Ok(())`
/// if the store has no recorded fingerprint yet (first index) or if every
/// field matches.
pub fn check_provider_match(
    store: &Store,
    active_provider: &str,
    active_model: &str,
    active_dim: usize,
) -> Result<(), StoreError> {
    let stored_provider = get(store, meta_keys::EMBED_PROVIDER)?;
    let stored_model = get(store, meta_keys::EMBED_MODEL)?;
    let stored_dim = get(store, meta_keys::EMBED_DIM)?;

    if stored_provider.is_none() && stored_model.is_none() && stored_dim.is_none() {
        return Ok(());
    }

    if let Some(stored) = &stored_provider {
        if stored != active_provider {
            return Err(StoreError::ProviderMismatch {
                stored: stored.clone(),
                active: active_provider.to_string(),
            });
        }
    }
    if let Some(stored) = &stored_model {
        if stored != active_model {
            return Err(StoreError::ProviderMismatch {
                stored: stored.clone(),
                active: active_model.to_string(),
            });
        }
    }
    if let Some(stored) = &stored_dim {
        if stored != &active_dim.to_string() {
            return Err(StoreError::ProviderMismatch {
                stored: stored.clone(),
                active: active_dim.to_string(),
            });
        }
    }
    Ok(())
}

pub fn record_provider(
    store: &Store,
    provider: &str,
    model: &str,
    dim: usize,
) -> Result<(), StoreError> {
    set(store, meta_keys::EMBED_PROVIDER, provider)?;
    set(store, meta_keys::EMBED_MODEL, model)?;
    set(store, meta_keys::EMBED_DIM, &dim.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_key_returns_none() {
        let store = Store::memory().unwrap();
        assert_eq!(get(&store, "nope").unwrap(), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = Store::memory().unwrap();
        set(&store, "k", "v").unwrap();
        assert_eq!(get(&store, "k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn first_index_has_no_mismatch() {
        let store = Store::memory().unwrap();
        check_provider_match(&store, "local", "nomic", 768).unwrap();
    }

    #[test]
    fn mismatched_provider_is_rejected() {
        let store = Store::memory().unwrap();
        record_provider(&store, "local", "nomic", 768).unwrap();
        let err = check_provider_match(&store, "openai_compatible", "nomic", 768).unwrap_err();
        assert!(matches!(err, StoreError::ProviderMismatch { .. }));
    }

    #[test]
    fn matching_provider_passes() {
        let store = Store::memory().unwrap();
        record_provider(&store, "local", "nomic", 768).unwrap();
        check_provider_match(&store, "local", "nomic", 768).unwrap();
    }
}
