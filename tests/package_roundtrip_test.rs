//! Integration tests for package generation and the archive round-trip.

use std::fs;
use std::io::Read;

use tempfile::TempDir;

use rotina::package::{self, RoutineManifest, templates};
use rotina::sites::CustomSite;
use rotina::store::CredentialStore;
use rotina::webui::{ImageAction, SessionState};

const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot-a-real-image";

fn configured_session(work_dir: &std::path::Path) -> SessionState {
    let mut session = SessionState::default();
    session
        .set_profile(work_dir, "Alice Mendes", "alice@example.com")
        .expect("Failed to set profile");
    session
        .select_presets(&["GMail".to_string(), "Spotify".to_string()])
        .expect("Failed to select presets");
    session
        .add_custom(CustomSite {
            nome: "Sistema \"Interno\"".to_string(),
            url: "https://sistema.exemplo.com".to_string(),
            login: Some("alice".to_string()),
            senha: Some("pw".to_string()),
        })
        .expect("Failed to add custom site");
    session.record_image_action(ImageAction {
        site: "SEI".to_string(),
        image: "botao_entrar.png".to_string(),
        acao: "aguardar o painel abrir".to_string(),
    });

    let images_dir = session.images_dir().expect("images dir missing");
    fs::write(images_dir.join("botao_entrar.png"), FAKE_PNG).expect("Failed to write image");

    session
}

fn seeded_store(work_dir: &std::path::Path) -> CredentialStore {
    let mut store =
        CredentialStore::open(&work_dir.join(".env")).expect("Failed to open store");
    store
        .write_batch(&[
            ("LOGIN_GMAIL".to_string(), "alice@gmail.com".to_string()),
            ("SENHA_GMAIL".to_string(), "gmail-pw".to_string()),
            ("LOGIN_SPOTIFY".to_string(), "alice".to_string()),
        ])
        .expect("Failed to seed store");
    store
}

#[test]
fn archive_round_trip_reproduces_paths_and_bytes() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let work_dir = temp_dir.path();
    let session = configured_session(work_dir);
    let store = seeded_store(work_dir);

    let archive_path =
        package::build(work_dir, &session, &store).expect("Package build failed");
    assert!(archive_path.exists());
    assert!(!work_dir.join(".package-staging").exists());

    let file = fs::File::open(&archive_path).expect("Failed to open archive");
    let mut archive = zip::ZipArchive::new(file).expect("Failed to read archive");

    let mut names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).expect("bad entry").name().to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            ".env",
            "INSTRUCTIONS.txt",
            "images/botao_entrar.png",
            "install.bat",
            "install.sh",
            "listen.bat",
            "listen.sh",
            "profile.json",
            "requirements.txt",
            "routine.toml",
        ]
    );

    // Byte-exact round trip for the verbatim template and the image.
    assert_eq!(entry_bytes(&mut archive, "listen.sh"), templates::LISTEN_SH.as_bytes());
    assert_eq!(entry_bytes(&mut archive, "images/botao_entrar.png"), FAKE_PNG);

    // The instructions carry the configured image action.
    let instructions = String::from_utf8(entry_bytes(&mut archive, "INSTRUCTIONS.txt")).unwrap();
    assert!(instructions.contains("aguardar o painel abrir"));
}

#[test]
fn generated_manifest_holds_exactly_the_selected_pairs() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let work_dir = temp_dir.path();
    let session = configured_session(work_dir);
    let store = seeded_store(work_dir);

    let archive_path =
        package::build(work_dir, &session, &store).expect("Package build failed");
    let file = fs::File::open(&archive_path).expect("Failed to open archive");
    let mut archive = zip::ZipArchive::new(file).expect("Failed to read archive");

    let manifest_text =
        String::from_utf8(entry_bytes(&mut archive, "routine.toml")).unwrap();
    let manifest = RoutineManifest::parse(&manifest_text).expect("Invalid manifest");

    let pairs: Vec<(&str, &str)> =
        manifest.sites.iter().map(|s| (s.key.as_str(), s.url.as_str())).collect();
    assert_eq!(
        pairs,
        vec![
            ("GMAIL", "https://mail.google.com"),
            ("SPOTIFY", "https://open.spotify.com"),
        ]
    );

    // The quoted custom name survived rendering (escape, not reject).
    assert_eq!(manifest.custom.len(), 1);
    assert_eq!(manifest.custom[0].nome, "Sistema \"Interno\"");

    // Credential lines: selected presets plus positional custom entries.
    let env = String::from_utf8(entry_bytes(&mut archive, ".env")).unwrap();
    assert!(env.contains("LOGIN_GMAIL=alice@gmail.com\n"));
    assert!(env.contains("SENHA_GMAIL=gmail-pw\n"));
    assert!(env.contains("LOGIN_SPOTIFY=alice\n"));
    assert!(env.contains("SENHA_SPOTIFY=\n"));
    assert!(env.contains("URL_CUSTOM_0=https://sistema.exemplo.com\n"));
    assert!(env.contains("LOGIN_CUSTOM_0=alice\n"));
    assert!(env.contains("SENHA_CUSTOM_0=pw\n"));
}

#[test]
fn failed_build_cleans_up_staging_and_archive() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let work_dir = temp_dir.path();
    let mut session = configured_session(work_dir);
    let store = seeded_store(work_dir);

    // Sabotage the image source: a user dir whose images/ path is a file
    // makes the copy step fail mid-build.
    let broken_dir = work_dir.join("broken-user");
    fs::create_dir_all(&broken_dir).expect("Failed to create broken dir");
    fs::write(broken_dir.join("images"), b"not a directory").expect("Failed to write file");
    session.user_dir = Some(broken_dir);

    assert!(package::build(work_dir, &session, &store).is_err());
    assert!(!work_dir.join(".package-staging").exists());
    assert!(!work_dir.join("Alice Mendes_automation.zip").exists());
}

fn entry_bytes(archive: &mut zip::ZipArchive<fs::File>, name: &str) -> Vec<u8> {
    let mut entry = archive.by_name(name).expect("missing archive entry");
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).expect("failed to read entry");
    bytes
}
