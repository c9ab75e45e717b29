//! `run` and `check`: execute or statically check a script file.

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use super::Error;
use crate::{engine::ScriptEngine, models::ExecutionRequest};

/// Arguments of `run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the script file.
    file: PathBuf,
    /// Id of a stored context to bind.
    #[arg(short, long)]
    context: Option<String>,
    /// Timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

/// Arguments of `check`.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the script file.
    file: PathBuf,
}

/// Runs the script and prints the result as JSON.
pub async fn execute(args: RunArgs, engine: &ScriptEngine) -> Result<(), Error> {
    let code = std::fs::read_to_string(&args.file)?;
    tracing::debug!(file = %args.file.display(), "Running script");

    let request = ExecutionRequest {
        code: Some(code),
        context_id: args.context,
        timeout: args.timeout_ms,
        ..Default::default()
    };
    let result = engine.execute_request(request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    match result.error_kind() {
        Some(kind) => Err(Error::ScriptFailed(kind)),
        None => Ok(()),
    }
}

/// Screens and parses the script without running it.
pub fn check(args: CheckArgs, engine: &ScriptEngine) -> Result<(), Error> {
    let code = std::fs::read_to_string(&args.file)?;
    let report = engine.check_script_security(&code);
    let syntax = engine.validate_syntax(&code);
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "safe": report.safe,
            "issues": report.issues,
            "syntax": syntax,
        }))?
    );

    if !report.safe {
        return Err(Error::ScriptRejected(report.issues.join("; ")));
    }
    if let Some(error) = syntax.error {
        return Err(Error::ScriptRejected(error));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn script_file(code: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(code.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_run_reports_script_failure() {
        let engine = ScriptEngine::default();
        let ok = script_file("return 40 + 2;");
        let args = RunArgs { file: ok.path().to_path_buf(), context: None, timeout_ms: None };
        assert!(execute(args, &engine).await.is_ok());

        let failing = script_file("throw \"nope\";");
        let args = RunArgs { file: failing.path().to_path_buf(), context: None, timeout_ms: None };
        assert!(matches!(execute(args, &engine).await, Err(Error::ScriptFailed(_))));
    }

    #[tokio::test]
    async fn test_run_with_unknown_context() {
        let engine = ScriptEngine::default();
        let file = script_file("1");
        let args =
            RunArgs { file: file.path().to_path_buf(), context: Some("missing".into()), timeout_ms: None };
        assert!(matches!(execute(args, &engine).await, Err(Error::Engine(_))));
    }

    #[test]
    fn test_check() {
        let engine = ScriptEngine::default();
        let clean = script_file("let x = 1; x + 1");
        assert!(check(CheckArgs { file: clean.path().to_path_buf() }, &engine).is_ok());

        let blocked = script_file("eval(\"1\")");
        assert!(matches!(
            check(CheckArgs { file: blocked.path().to_path_buf() }, &engine),
            Err(Error::ScriptRejected(_))
        ));

        let broken = script_file("let = ");
        assert!(check(CheckArgs { file: broken.path().to_path_buf() }, &engine).is_err());
    }

    #[test]
    fn test_missing_file() {
        let engine = ScriptEngine::default();
        let args = CheckArgs { file: PathBuf::from("/definitely/not/here.rhai") };
        assert!(matches!(check(args, &engine), Err(Error::Io(_))));
    }
}
