use std::path::Path;

use tracing::{error, info};

use crate::log_scope::LogScope;
use crate::runner::{CaseOutcome, Expectation, HarnessError, Runner};
use crate::template::{self, SetterCall};

///////////////////////////////////////////////////////////////////////////////

pub const JAVA_TEST_NAME: &str = "TestDockerJava";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub name: String,
    pub setter: SetterCall,
    pub expectation: Expectation,
}

impl Case {
    pub fn script(&self) -> String {
        template::render_setter(&self.setter)
    }

    pub fn command(&self) -> Vec<String> {
        template::shell_command(self.script())
    }
}

/// A type-correct binding that must pass and a type mismatch the server has
/// to reject.
pub fn java_cases() -> Vec<Case> {
    vec![
        Case {
            name: "java-success".to_owned(),
            setter: SetterCall::int(2, 3),
            expectation: Expectation::Success,
        },
        Case {
            name: "java-fail".to_owned(),
            setter: SetterCall::string(2, "a"),
            expectation: Expectation::Failure,
        },
    ]
}

///////////////////////////////////////////////////////////////////////////////

/// Runs the cases in order inside one log scope, stopping at the first
/// failure.
pub async fn run_cases(
    runner: &Runner,
    test_name: &str,
    cases: &[Case],
    log_root: Option<&Path>,
) -> Result<Vec<CaseOutcome>, HarnessError> {
    let scope = LogScope::new(test_name, log_root)?;

    let mut outcomes = Vec::with_capacity(cases.len());
    let mut result = Ok(());
    for case in cases {
        info!(test = test_name, case = %case.name, setter = %case.setter, "Running case");
        match runner
            .run(&scope, &case.name, case.command(), case.expectation)
            .await
        {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                error!(test = test_name, case = %case.name, error = %e, "Case failed");
                result = Err(e);
                break;
            }
        }
    }

    scope.close(result.is_err());
    result.map(|_| outcomes)
}

pub async fn run_java(
    runner: &Runner,
    log_root: Option<&Path>,
) -> Result<Vec<CaseOutcome>, HarnessError> {
    run_cases(runner, JAVA_TEST_NAME, &java_cases(), log_root).await
}

///////////////////////////////////////////////////////////////////////////////
