use std::path::PathBuf;

use pgwire_java_acceptance::{run_java, HarnessConfig, Runner};

fn config_from_env() -> HarnessConfig {
    let mut cfg = match std::env::var_os("ACCEPTANCE_CONFIG") {
        Some(path) => HarnessConfig::load(&PathBuf::from(path)).unwrap(),
        None => HarnessConfig::default(),
    };
    if let Ok(host) = std::env::var("ACCEPTANCE_PGHOST") {
        cfg.pg_host = host;
    }
    if let Ok(port) = std::env::var("ACCEPTANCE_PGPORT") {
        cfg.pg_port = port.parse().unwrap();
    }
    if let Some(certs_dir) = std::env::var_os("ACCEPTANCE_CERTS_DIR") {
        cfg.certs_dir = PathBuf::from(certs_dir);
    }
    cfg
}

#[tokio::test]
#[ignore = "needs docker and a running database with certs"]
async fn test_docker_java() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("pgwire_java_acceptance=info")
        .try_init();

    let runner = Runner::new(config_from_env());

    let outcomes = run_java(&runner, runner.config().log_dir.as_deref())
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);
}
