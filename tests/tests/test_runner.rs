use std::path::PathBuf;
use std::time::Duration;

use pgwire_java_acceptance::log_scope::LogScope;
use pgwire_java_acceptance::scenario::{run_cases, run_java, Case};
use pgwire_java_acceptance::{Expectation, HarnessConfig, HarnessError, Runner, SetterCall};

use crate::utils::fake_runtime::{fake_config, fake_runtime_binary};

#[tokio::test]
async fn test_java_cases_pass_against_conforming_server() {
    let root = tempfile::tempdir().unwrap();
    let runner = Runner::new(HarnessConfig {
        pg_host: "roach0".to_owned(),
        ..fake_config()
    });

    let outcomes = run_java(&runner, Some(root.path())).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].expectation, Expectation::Success);
    assert_eq!(outcomes[0].exit_code, 0);
    assert_eq!(outcomes[1].expectation, Expectation::Failure);
    assert_eq!(outcomes[1].exit_code, 1);
    assert_ne!(outcomes[0].container_name, outcomes[1].container_name);

    let scope_dir = std::fs::read_dir(root.path())
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    assert!(scope_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("TestDockerJava-"));

    let stdout = std::fs::read_to_string(scope_dir.join("java-success.stdout.log")).unwrap();
    assert!(stdout.contains("PGHOST=roach0\n"));
    assert!(stdout.contains("PGPORT=26257\n"));
    assert!(stdout.contains("PGSSLCERT=/certs/node.crt\n"));
    assert!(stdout.contains("PGSSLKEY=/certs/node.key\n"));
    assert!(stdout.contains("/srv/certs:/certs:ro\n"));
    assert!(stdout.contains("--rm\n"));

    assert!(stdout.contains("stmt.setInt(2, 3);"));
    assert!(!stdout.contains(r#"stmt.setString(2, "a");"#));

    // Each case gets its own log files
    let success_stderr =
        std::fs::read_to_string(scope_dir.join("java-success.stderr.log")).unwrap();
    assert!(!success_stderr.contains("PSQLException"));

    let fail_stdout = std::fs::read_to_string(scope_dir.join("java-fail.stdout.log")).unwrap();
    assert!(fail_stdout.contains(r#"stmt.setString(2, "a");"#));
    assert!(!fail_stdout.contains("stmt.setInt(2, 3);"));

    let fail_stderr = std::fs::read_to_string(scope_dir.join("java-fail.stderr.log")).unwrap();
    assert!(fail_stderr.contains("PSQLException"));
}

#[tokio::test]
async fn test_run_success_rejects_failing_container() {
    let runner = Runner::new(fake_config());
    let scope = LogScope::new("TestRunSuccess", None).unwrap();

    let cmd = pgwire_java_acceptance::template::shell_command(
        pgwire_java_acceptance::template::render_setter(&SetterCall::string(2, "a")),
    );
    let err = runner.run_success(&scope, "java", cmd).await.unwrap_err();

    match err {
        HarnessError::UnexpectedExit {
            expected, actual, ..
        } => {
            assert_eq!(expected, 0);
            assert_eq!(actual, Some(1));
        }
        e => panic!("unexpected error: {e:?}"),
    }
    scope.close(false);
}

#[tokio::test]
async fn test_run_fail_rejects_passing_container() {
    let runner = Runner::new(fake_config());
    let scope = LogScope::new("TestRunFail", None).unwrap();

    let cmd = pgwire_java_acceptance::template::shell_command(pgwire_java_acceptance::render(
        "Int(2, 3)",
    ));
    let err = runner.run_fail(&scope, "java", cmd).await.unwrap_err();

    assert!(matches!(
        err,
        HarnessError::UnexpectedExit {
            expected: 1,
            actual: Some(0),
            ..
        }
    ));
    scope.close(false);
}

#[tokio::test]
async fn test_logs_kept_when_case_fails() {
    let runner = Runner::new(fake_config());
    let cases = [
        Case {
            name: "java".to_owned(),
            setter: SetterCall::string(2, "a"),
            expectation: Expectation::Success,
        },
        Case {
            name: "never-run".to_owned(),
            setter: SetterCall::int(2, 3),
            expectation: Expectation::Success,
        },
    ];

    let err = run_cases(&runner, "TestKeepLogs", &cases, None)
        .await
        .unwrap_err();

    let log_dir = match err {
        HarnessError::UnexpectedExit { log_dir, .. } => log_dir,
        e => panic!("unexpected error: {e:?}"),
    };
    assert!(log_dir.join("java.stderr.log").is_file());
    assert!(!log_dir.join("never-run.stdout.log").exists());

    std::fs::remove_dir_all(log_dir).unwrap();
}

#[tokio::test]
async fn test_timeout_kills_container() {
    let runner = Runner::new(HarnessConfig {
        timeout: Duration::from_millis(500),
        ..fake_config()
    });
    let cases = [Case {
        name: "sleepy".to_owned(),
        setter: SetterCall::Raw("Sleep".to_owned()),
        expectation: Expectation::Success,
    }];
    let root = tempfile::tempdir().unwrap();

    let err = run_cases(&runner, "TestTimeout", &cases, Some(root.path()))
        .await
        .unwrap_err();

    match err {
        HarnessError::Timeout { name, timeout, .. } => {
            assert_eq!(name, "sleepy");
            assert_eq!(timeout, Duration::from_millis(500));
        }
        e => panic!("unexpected error: {e:?}"),
    }
}

#[tokio::test]
async fn test_missing_runtime_binary() {
    // Keeps the fake written first, see fake_runtime_binary
    let _ = fake_runtime_binary();

    let runner = Runner::new(HarnessConfig {
        runtime_binary: Some(PathBuf::from("/nonexistent/bin/docker")),
        ..HarnessConfig::default()
    });
    let root = tempfile::tempdir().unwrap();

    let err = run_java(&runner, Some(root.path())).await.unwrap_err();

    assert!(matches!(err, HarnessError::Spawn { .. }));
    assert!(err.to_string().contains("/nonexistent/bin/docker"));
}
