//! Running a local engine program with piped stdin/stdout.

use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::EngineError;

/// Run `program args…`, feed `input` on stdin and collect stdout.
///
/// Stdin is written from a separate task so an engine that starts emitting
/// output before it has consumed all input cannot deadlock on a full pipe.
pub async fn run_engine(program: &str, args: &[String], input: Vec<u8>) -> Result<Vec<u8>, EngineError> {
    log::debug!("engine: {program} {}", args.join(" "));

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| EngineError::Launch {
            program: program.to_string(),
            source,
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| EngineError::Worker(format!("{program} stdin unavailable")))?;
    let writer = tokio::spawn(async move {
        stdin.write_all(&input).await?;
        stdin.shutdown().await
    });

    let output = child.wait_with_output().await?;

    match writer.await {
        Ok(Ok(())) => {}
        // The engine may legitimately close stdin early; its exit status
        // decides the outcome.
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
        Ok(Err(e)) => return Err(EngineError::Io(e)),
        Err(e) => return Err(EngineError::Worker(e.to_string())),
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(EngineError::Failed {
            program: program.to_string(),
            stderr: if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            },
        });
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_a_launch_error() {
        let err = run_engine("/nonexistent/engine-binary", &[], b"x".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Launch { .. }));
        assert!(err.to_string().contains("/nonexistent/engine-binary"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn pipes_stdin_to_stdout() {
        let out = run_engine("cat", &[], b"round trip".to_vec()).await.unwrap();
        assert_eq!(out, b"round trip");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_failed() {
        let err = run_engine("false", &[], Vec::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::Failed { .. }));
    }
}
