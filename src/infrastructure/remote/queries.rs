pub(super) const SELECT_RECORDS_BY_INTEGRATION: &str = r#"
    SELECT id, integration, external_id, display_name, payload,
           source_created_at, source_updated_at, content_hash, created_at, updated_at
    FROM synced_records
    WHERE integration = ?1
    ORDER BY COALESCE(source_updated_at, source_created_at) DESC
"#;

pub(super) const SELECT_RECORD_HASH: &str = r#"
    SELECT content_hash
    FROM synced_records
    WHERE integration = ?1 AND external_id = ?2
"#;

pub(super) const INSERT_RECORD: &str = r#"
    INSERT INTO synced_records (
        id, integration, external_id, display_name, payload,
        source_created_at, source_updated_at, content_hash, created_at, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
"#;

pub(super) const UPDATE_RECORD: &str = r#"
    UPDATE synced_records
    SET display_name = ?3,
        payload = ?4,
        source_created_at = ?5,
        source_updated_at = ?6,
        content_hash = ?7,
        updated_at = ?8
    WHERE integration = ?1 AND external_id = ?2
"#;

pub(super) const SELECT_STATUS: &str = r#"
    SELECT integration, last_sync_at, last_sync_error, is_syncing, last_record_count, updated_at
    FROM sync_status
    WHERE integration = ?1
"#;

pub(super) const UPSERT_STATUS: &str = r#"
    INSERT INTO sync_status (
        integration, last_sync_at, last_sync_error, is_syncing, last_record_count, updated_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(integration) DO UPDATE SET
        last_sync_at = excluded.last_sync_at,
        last_sync_error = excluded.last_sync_error,
        is_syncing = excluded.is_syncing,
        last_record_count = excluded.last_record_count,
        updated_at = excluded.updated_at
"#;

pub(super) const RESET_STALE_SYNC_FLAG: &str = r#"
    UPDATE sync_status
    SET is_syncing = 0,
        updated_at = ?1
    WHERE integration = ?2 AND is_syncing = 1
"#;
