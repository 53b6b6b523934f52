use crate::store::operations::sentiments::SentimentRecord;
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![("001_validate_sentiment_history", m001_validate_sentiment_history)]
}

/// 执行所有未应用的数据库迁移。
///
/// 每个迁移函数必须幂等：进程可能在迁移完成后、写入版本号之前崩溃，
/// 重启后会再次执行。版本号只允许前进。
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;

    for (index, (name, func)) in migrations().iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.config_versions.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
                version: 0,
                message: format!("corrupt version marker ({} bytes)", raw.len()),
            })?;
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .config_versions
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

/// 删除无法解码的情感记录，否则历史查询会整体失败
fn m001_validate_sentiment_history(store: &Store) -> Result<(), StoreError> {
    let mut removed = 0usize;
    for item in store.sentiment_history.iter() {
        let (key, value) = item?;
        if Store::deserialize::<SentimentRecord>(&value).is_err() {
            store.sentiment_history.remove(&key)?;
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::warn!(removed, "Dropped undecodable sentiment records");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn migration_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        let store = Store::open(path.to_str().unwrap()).unwrap();

        run(&store).unwrap();
        let first = get_current_version(&store).unwrap();
        run(&store).unwrap();
        let second = get_current_version(&store).unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 1);
    }

    #[test]
    fn undecodable_sentiment_records_are_dropped() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db3").to_str().unwrap()).unwrap();

        let good = SentimentRecord::new("fine day", "Positive", Vec::new());
        store.create_sentiment(&good).unwrap();
        store
            .sentiment_history
            .insert(b"garbage".as_slice(), b"{not json".as_slice())
            .unwrap();

        run(&store).unwrap();

        assert!(store.sentiment_history.get(b"garbage").unwrap().is_none());
        assert_eq!(store.list_recent_sentiments(10).unwrap(), vec![good]);
    }

    #[test]
    fn downgrade_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db2");
        let store = Store::open(path.to_str().unwrap()).unwrap();

        set_version(&store, 3).unwrap();
        let err = set_version(&store, 2).unwrap_err();
        assert!(matches!(err, StoreError::Migration { .. }));
    }
}
