use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use pgwire_java_acceptance::HarnessConfig;
use tempfile::TempDir;

/// Stands in for `docker`: echoes its arguments, then behaves like a server
/// that accepts the `setInt(2, 3)` binding and rejects everything else.
/// A `Sleep` setter makes it hang.
const FAKE_RUNTIME: &str = r#"#!/bin/sh
case "$1" in
  kill|rm) exit 0 ;;
esac
for last; do :; done
printf '%s\n' "$@"
case "$last" in
  *'stmt.setSleep;'*) exec sleep 30 ;;
  *'stmt.setInt(2, 3);'*) exit 0 ;;
  *)
    echo 'Exception in thread "main" org.postgresql.util.PSQLException: could not parse "a" as type int' >&2
    exit 1
    ;;
esac
"#;

static FAKE: OnceLock<(TempDir, PathBuf)> = OnceLock::new();

/// Written once per test binary, before anything is spawned, so no exec can
/// race a still-open write handle.
pub fn fake_runtime_binary() -> &'static Path {
    let (_, path) = FAKE.get_or_init(|| {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake-docker");
        std::fs::write(&path, FAKE_RUNTIME).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        (dir, path)
    });
    path
}

pub fn fake_config() -> HarnessConfig {
    HarnessConfig {
        runtime_binary: Some(fake_runtime_binary().to_owned()),
        certs_dir: PathBuf::from("/srv/certs"),
        timeout: Duration::from_secs(30),
        ..HarnessConfig::default()
    }
}
