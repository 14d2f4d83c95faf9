mod common;

#[cfg(unix)]
mod session_lifecycle {
    use std::time::{Duration, Instant};

    use headless_pty::{Session, SessionConfig, SessionState, EXIT_UNKNOWN};

    use crate::common::wait_for;

    fn sh(script: &str) -> SessionConfig {
        let mut config = SessionConfig::new("/bin/sh");
        config.args = vec!["-c".to_string(), script.to_string()];
        config
    }

    #[test]
    fn immediate_exit_ends_session_without_stop() {
        let mut session = Session::new();
        assert!(session.start(&sh("exit 7")), "{}", session.last_error());
        assert_eq!(session.state(), SessionState::Running);

        assert_eq!(session.wait(Duration::from_secs(5)), 7);
        assert!(
            wait_for(|| !session.is_running(), Duration::from_secs(5)),
            "session should mark itself not-running after child exit"
        );
    }

    #[test]
    fn write_after_child_exit_returns_false() {
        let mut session = Session::new();
        assert!(session.start(&sh("exit 0")), "{}", session.last_error());
        assert_eq!(session.wait(Duration::from_secs(5)), 0);

        // The monitor tears the pty down right after the exit; once that
        // lands, writes must fail cleanly rather than crash.
        assert!(
            wait_for(|| !session.write_str("x"), Duration::from_secs(5)),
            "write should start failing once the pty is torn down"
        );
        assert!(!session.last_error().is_empty());
    }

    #[test]
    fn stop_is_bounded_against_an_ignoring_child() {
        let mut session = Session::new();
        assert!(
            session.start(&sh("trap '' TERM INT; sleep 30")),
            "{}",
            session.last_error()
        );
        // Let the trap install before we try to bring the child down.
        std::thread::sleep(Duration::from_millis(200));

        let started = Instant::now();
        session.stop();
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "stop must force-kill, not wait for cooperative exit"
        );
        assert!(!session.is_running());
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut session = Session::new();
        assert!(session.start(&sh("sleep 30")), "{}", session.last_error());
        session.stop();
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn session_starts_exactly_once() {
        let mut session = Session::new();
        assert!(session.start(&sh("exit 0")), "{}", session.last_error());
        assert!(!session.start(&sh("exit 0")));
        assert!(session.last_error().contains("already started"));

        // Also true after a stop: restart requires a fresh instance.
        session.stop();
        assert!(!session.start(&sh("exit 0")));
    }

    #[test]
    fn wait_times_out_with_sentinel() {
        let mut session = Session::new();
        assert!(session.start(&sh("sleep 30")), "{}", session.last_error());
        assert_eq!(session.wait(Duration::from_millis(50)), EXIT_UNKNOWN);
        session.stop();
    }

    #[test]
    fn spawn_failure_aborts_start_with_context() {
        let mut session = Session::new();
        let config = SessionConfig::new("/nonexistent/definitely-not-a-binary");
        assert!(!session.start(&config));
        assert!(
            session
                .last_error()
                .starts_with("failed to spawn child process: "),
            "unexpected error: {}",
            session.last_error()
        );
        assert!(!session.is_running());
        // Partial state is safe to drop.
        session.stop();
    }

    #[test]
    fn stop_terminates_detached_grandchildren() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("marker");

        // The grandchild ignores SIGHUP via nohup and would write the
        // marker two seconds after stop() unless the whole group dies.
        let script = format!(
            "nohup sh -c 'sleep 2; echo alive > {}' >/dev/null 2>&1 & sleep 30",
            marker.display()
        );
        let mut session = Session::new();
        assert!(session.start(&sh(&script)), "{}", session.last_error());

        // Give the shell time to fork the grandchild.
        std::thread::sleep(Duration::from_millis(300));
        session.stop();

        std::thread::sleep(Duration::from_secs(3));
        assert!(
            !marker.exists(),
            "grandchild outlived the process-group teardown"
        );
    }

    #[test]
    fn child_runs_in_configured_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .expect("dir name")
            .to_string();

        let sink = std::sync::Arc::new(headless_pty::BufferSink::new());
        let mut session = Session::new();
        session.set_output_sink(sink.clone());

        let mut config = sh("pwd");
        config.working_dir = Some(dir.path().to_path_buf());
        assert!(session.start(&config), "{}", session.last_error());

        assert!(
            wait_for(
                || sink.contents_string().contains(&marker),
                Duration::from_secs(5)
            ),
            "expected cwd in output, got: {}",
            sink.contents_string()
        );
        assert_eq!(session.wait(Duration::from_secs(5)), 0);
    }
}
