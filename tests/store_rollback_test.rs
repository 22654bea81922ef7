//! Integration tests for credential-store batch writes and rollback.

use std::fs;

use tempfile::TempDir;

use rotina::store::CredentialStore;

fn entry(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

#[test]
fn batch_write_persists_every_key() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join(".env");

    let mut store = CredentialStore::open(&store_path).expect("Failed to open store");
    store
        .write_batch(&[
            entry("LOGIN_GMAIL", "alice@gmail.com"),
            entry("SENHA_GMAIL", "s3cret"),
            entry("URL_CUSTOM_0", "https://intranet.local"),
        ])
        .expect("Batch write failed");

    let reloaded = CredentialStore::open(&store_path).expect("Failed to reopen store");
    assert_eq!(reloaded.get("LOGIN_GMAIL"), Some("alice@gmail.com"));
    assert_eq!(reloaded.get("SENHA_GMAIL"), Some("s3cret"));
    assert_eq!(reloaded.get("URL_CUSTOM_0"), Some("https://intranet.local"));

    // No backup left behind after a successful batch.
    assert!(!temp_dir.path().join(".env.backup").exists());
}

#[test]
fn failed_batch_restores_the_file_byte_for_byte() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join(".env");
    let original = "# existing\nLOGIN_GMAIL=old-login\nSENHA_GMAIL=old-senha\n";
    fs::write(&store_path, original).expect("Failed to seed store file");

    let mut store = CredentialStore::open(&store_path).expect("Failed to open store");
    let result = store.write_batch(&[
        entry("LOGIN_GMAIL", "new-login"),
        // Invalid key in the middle of the batch: '=' is reserved.
        entry("BAD=KEY", "whatever"),
        entry("SENHA_GMAIL", "new-senha"),
    ]);

    assert!(result.is_err());
    let after = fs::read(&store_path).expect("Failed to read store file");
    assert_eq!(after, original.as_bytes());
    assert!(!temp_dir.path().join(".env.backup").exists());

    // The in-memory view matches the restored file again.
    assert_eq!(store.get("LOGIN_GMAIL"), Some("old-login"));
}

#[test]
fn failed_batch_on_a_fresh_store_leaves_no_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join(".env");

    let mut store = CredentialStore::open(&store_path).expect("Failed to open store");
    let result = store.write_batch(&[
        entry("LOGIN_GMAIL", "alice"),
        entry("", "empty key is invalid"),
    ]);

    assert!(result.is_err());
    assert!(!store_path.exists());
}

#[test]
fn custom_scan_over_a_file_stops_at_the_gap() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store_path = temp_dir.path().join(".env");
    fs::write(
        &store_path,
        "URL_CUSTOM_0=https://zero.example.com\nURL_CUSTOM_2=https://two.example.com\n",
    )
    .expect("Failed to seed store file");

    let store = CredentialStore::open(&store_path).expect("Failed to open store");
    let customs = store.custom_sites();
    assert_eq!(customs.len(), 1);
    assert_eq!(customs[0].url, "https://zero.example.com");
}
