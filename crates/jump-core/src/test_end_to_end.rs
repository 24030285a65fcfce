//! End-to-end runs against the scripted engine

#[cfg(test)]
mod end_to_end_tests {
    use crate::config::HarnessConfig;
    use crate::engine::{ContainerInfo, ImageInfo, LogChunk, PullEvent};
    use crate::errors::{EngineOp, JumpError};
    use crate::image::TerminalOp;
    use crate::orchestrator::{prepare, Orchestrator};
    use crate::test_utils::{EngineCall, MockEngine, RecordingTerminal, ScriptedPull};
    use bytes::Bytes;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// `<root>/two_sum/<source>` with its test cases, and the matching
    /// runner under `<root>/test_shared`.
    fn problem(source: &str, content: &str) -> (TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let problem = root.path().join("two_sum");
        let shared = root.path().join("test_shared");
        fs::create_dir_all(&problem).unwrap();
        fs::create_dir_all(&shared).unwrap();

        let path = problem.join(source);
        let stem = path.file_stem().unwrap().to_string_lossy().to_string();
        let extension = path.extension().unwrap().to_string_lossy().to_string();
        fs::write(&path, content).unwrap();
        fs::write(problem.join(format!("{}.test_cases.json", stem)), "[[1, 2], 3]").unwrap();
        fs::write(shared.join(format!("test_runner.{}", extension)), "runner").unwrap();
        (root, path)
    }

    fn created_spec(engine: &MockEngine) -> crate::engine::ContainerSpec {
        engine
            .calls()
            .into_iter()
            .find_map(|call| match call {
                EngineCall::Create(spec) => Some(spec),
                _ => None,
            })
            .expect("container was created")
    }

    async fn run_with(
        engine: &MockEngine,
        source: &Path,
        terminal: RecordingTerminal,
    ) -> Result<crate::container::ExecutionOutcome, JumpError> {
        let config = HarnessConfig::default();
        let plan = prepare(source, &config, &config.registry()).await?;
        Orchestrator::new(engine, &config)
            .execute(&plan, terminal, tokio::io::sink(), tokio::io::sink())
            .await
    }

    #[tokio::test]
    async fn test_python_hello() {
        let (_root, source) = problem("sol.py", "print(\"hello\")\n");
        let engine = MockEngine::new()
            .with_image("python:alpine")
            .with_logs(vec![LogChunk::Stdout(Bytes::from_static(b"hello\n"))]);

        let outcome = run_with(&engine, &source, RecordingTerminal::default())
            .await
            .unwrap();

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.stdout, b"hello\n");
        assert!(outcome.stderr.is_empty());

        let spec = created_spec(&engine);
        assert_eq!(spec.image, "python:alpine");
        assert_eq!(spec.working_dir, "/app");
        assert_eq!(&spec.cmd[..2], ["/bin/sh", "-c"]);
        assert!(spec.cmd[2].contains("python3 /app/sol.py"));
        assert!(spec.name.as_deref().unwrap().starts_with("jump-python-"));

        let staged: Vec<String> = engine
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Upload { dest_dir, files, .. } => {
                    assert_eq!(dest_dir, "/app");
                    Some(files[0].0.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(staged, ["sol.py", "sol.test_cases.json", "test_runner.py"]);
    }

    #[tokio::test]
    async fn test_cpp_compiles_then_runs() {
        let (_root, source) = problem("sol.cpp", "int main() { return 0; }\n");
        let engine = MockEngine::new().with_image("gcc:trixie");

        run_with(&engine, &source, RecordingTerminal::default())
            .await
            .unwrap();

        let script = created_spec(&engine).cmd[2].clone();
        let compile = script.find("g++ /app/sol.cpp -o /app/sol").expect("compile step");
        let execute = script.find("&& /app/sol").expect("run step");
        assert!(compile < execute);
    }

    #[tokio::test]
    async fn test_pull_rows_and_cursor_motion() {
        let (_root, source) = problem("sol.py", "print(1)\n");
        let engine = MockEngine::new();
        engine.set_pull(vec![
            ScriptedPull::Event(PullEvent::new("a", "Downloading")),
            ScriptedPull::Event(PullEvent::new("b", "Downloading")),
            ScriptedPull::Event(PullEvent::new("a", "Pull complete")),
            ScriptedPull::Event(PullEvent::new(
                "",
                "Status: Downloaded newer image for python:alpine",
            )),
        ]);
        let terminal = RecordingTerminal::default();

        run_with(&engine, &source, terminal.clone()).await.unwrap();

        let ops = terminal.ops();
        assert_eq!(
            &ops[..9],
            [
                TerminalOp::HideCursor,
                TerminalOp::Line(String::new()),
                TerminalOp::ClearLine,
                TerminalOp::Line("a: Downloading".to_string()),
                TerminalOp::ClearLine,
                TerminalOp::Line("b: Downloading".to_string()),
                TerminalOp::MoveUp(2),
                TerminalOp::ClearLine,
                TerminalOp::Line("a: Pull complete".to_string()),
            ]
        );
        assert_eq!(ops.last(), Some(&TerminalOp::ShowCursor));
        assert_eq!(terminal.count(&TerminalOp::ShowCursor), 1);

        let pulled = engine.position(|call| matches!(call, EngineCall::Pull(_))).unwrap();
        let created = engine.position(|call| matches!(call, EngineCall::Create(_))).unwrap();
        assert!(pulled < created);
    }

    #[tokio::test]
    async fn test_image_under_secondary_tag_still_runs() {
        let (_root, source) = problem("sol.py", "print(\"hello\")\n");
        let engine = MockEngine::new()
            .with_images(vec![ImageInfo {
                id: "sha256:py".to_string(),
                tags: vec!["python:3-alpine".to_string(), "python:alpine".to_string()],
            }])
            .with_logs(vec![LogChunk::Stdout(Bytes::from_static(b"hello\n"))]);
        engine.set_pull(vec![ScriptedPull::Event(PullEvent::new(
            "",
            "Status: Image is up to date for python:alpine",
        ))]);

        let outcome = run_with(&engine, &source, RecordingTerminal::default())
            .await
            .unwrap();

        assert_eq!(outcome.stdout, b"hello\n");
        let pulled = engine.position(|call| matches!(call, EngineCall::Pull(_))).unwrap();
        let created = engine.position(|call| matches!(call, EngineCall::Create(_))).unwrap();
        assert!(pulled < created);
    }

    #[tokio::test]
    async fn test_unmapped_extension_makes_no_engine_calls() {
        let (_root, source) = problem("sol.kt", "fun main() {}\n");
        let engine = MockEngine::new();

        let err = run_with(&engine, &source, RecordingTerminal::default())
            .await
            .unwrap_err();

        match err {
            JumpError::UnsupportedExtension { extension } => assert_eq!(extension, "kt"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_runner_aborts_before_create() {
        let (root, source) = problem("sol.py", "print(1)\n");
        fs::remove_file(root.path().join("test_shared/test_runner.py")).unwrap();
        let engine = MockEngine::new().with_image("python:alpine");

        let err = run_with(&engine, &source, RecordingTerminal::default())
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("test_runner.py"));
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stale_container_evicted_and_failure_cleaned_up() {
        let (_root, source) = problem("sol.js", "console.log(1)\n");
        let engine = MockEngine::new()
            .with_image("node:alpine")
            .with_containers(vec![ContainerInfo {
                id: "old".to_string(),
                image: "node:alpine".to_string(),
                status: "Up 2 minutes".to_string(),
            }])
            .failing_on(EngineOp::Start);

        let err = run_with(&engine, &source, RecordingTerminal::default())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 4);

        let evicted = engine.position(|call| *call == EngineCall::Remove("old".to_string()));
        let created = engine.position(|call| matches!(call, EngineCall::Create(_)));
        assert!(evicted.unwrap() < created.unwrap());
        assert_eq!(
            engine.calls().last(),
            Some(&EngineCall::Remove(crate::test_utils::MOCK_CONTAINER_ID.to_string()))
        );
    }

    #[tokio::test]
    async fn test_program_exit_code_is_reported() {
        let (_root, source) = problem("sol.rs", "fn main() { std::process::exit(3) }\n");
        let engine = MockEngine::new()
            .with_image("rust:alpine")
            .with_exit_code(3)
            .with_logs(vec![LogChunk::Stderr(Bytes::from_static(b"assertion failed\n"))]);

        let outcome = run_with(&engine, &source, RecordingTerminal::default())
            .await
            .unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stderr, b"assertion failed\n");
        assert!(created_spec(&engine).cmd[2].contains("rustc /app/sol.rs -o /app/sol"));
    }
}
