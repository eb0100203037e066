use osh::{Config, Interpreter, Outcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};

// Every test forks, and the reclamation sweep collects any finished child of
// the test process, so tests must not overlap.
fn lock_processes() -> MutexGuard<'static, ()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("osh_tests_{}_{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn interpreter() -> Interpreter {
    Interpreter::new(Config {
        max_line: 4096,
        ..Config::default()
    })
}

fn eval(sh: &mut Interpreter, line: &str) -> (Outcome, String) {
    let mut out = Vec::new();
    let outcome = sh
        .eval_line_with_output(line, &mut out)
        .unwrap_or_else(|e| panic!("{line:?} failed: {e:#}"));
    (outcome, String::from_utf8(out).expect("utf8"))
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

#[test]
fn test_echo_into_file() {
    let _lock = lock_processes();
    let dir = temp_dir("echo");
    let out = dir.join("out.txt");
    let mut sh = interpreter();

    let (outcome, _) = eval(&mut sh, &format!("echo hi there > {}", out.display()));
    assert_eq!(outcome, Outcome::Completed(0));
    assert_eq!(read(&out), "hi there\n");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_output_redirect_truncates() {
    let _lock = lock_processes();
    let dir = temp_dir("truncate");
    let out = dir.join("out.txt");
    fs::write(&out, "a much longer previous content\n").unwrap();
    let mut sh = interpreter();

    eval(&mut sh, &format!("echo short > {}", out.display()));
    assert_eq!(read(&out), "short\n");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_exit_status_of_program() {
    let _lock = lock_processes();
    let mut sh = interpreter();
    assert_eq!(eval(&mut sh, "true").0, Outcome::Completed(0));
    assert_eq!(eval(&mut sh, "false").0, Outcome::Completed(1));
}

#[test]
fn test_missing_program() {
    let _lock = lock_processes();
    let mut sh = interpreter();
    assert_eq!(
        eval(&mut sh, "osh-definitely-not-a-program --flag").0,
        Outcome::Completed(127)
    );
}

#[test]
fn test_two_stage_pipe() {
    let _lock = lock_processes();
    let dir = temp_dir("pipe2");
    let input = dir.join("in.txt");
    let out = dir.join("out.txt");
    fs::write(&input, "one\ntwo\nthree\n").unwrap();
    let mut sh = interpreter();

    let line = format!("cat {} | wc -l > {}", input.display(), out.display());
    assert_eq!(eval(&mut sh, &line).0, Outcome::Completed(0));
    assert_eq!(read(&out).trim(), "3");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_three_stage_pipe_with_input_redirect() {
    let _lock = lock_processes();
    let dir = temp_dir("pipe3");
    let input = dir.join("in.txt");
    let out = dir.join("out.txt");
    fs::write(&input, "pear\napple\nfig\n").unwrap();
    let mut sh = interpreter();

    let line = format!(
        "sort < {} | head -n 2 | tail -n 1 > {}",
        input.display(),
        out.display()
    );
    assert_eq!(eval(&mut sh, &line).0, Outcome::Completed(0));
    assert_eq!(read(&out), "fig\n");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_status_is_from_last_stage() {
    let _lock = lock_processes();
    let mut sh = interpreter();
    assert_eq!(eval(&mut sh, "false | true").0, Outcome::Completed(0));
    assert_eq!(eval(&mut sh, "true | false").0, Outcome::Completed(1));
}

#[test]
fn test_input_redirect() {
    let _lock = lock_processes();
    let dir = temp_dir("input");
    let input = dir.join("in.txt");
    let out = dir.join("out.txt");
    fs::write(&input, "a\nb\n").unwrap();
    let mut sh = interpreter();

    let line = format!("wc -l < {} > {}", input.display(), out.display());
    assert_eq!(eval(&mut sh, &line).0, Outcome::Completed(0));
    assert_eq!(read(&out).trim(), "2");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_missing_input_file_fails_stage() {
    let _lock = lock_processes();
    let dir = temp_dir("missing_input");
    let mut sh = interpreter();

    let line = format!("cat < {}", dir.join("nope.txt").display());
    assert_eq!(eval(&mut sh, &line).0, Outcome::Completed(1));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_redirect_only_creates_file() {
    let _lock = lock_processes();
    let dir = temp_dir("create");
    let out = dir.join("new.txt");
    let mut sh = interpreter();

    assert_eq!(
        eval(&mut sh, &format!("> {}", out.display())).0,
        Outcome::Completed(0)
    );
    assert_eq!(read(&out), "");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_history_replays_previous_line() {
    let _lock = lock_processes();
    let dir = temp_dir("history");
    let out = dir.join("out.txt");
    let mut sh = interpreter();

    let (outcome, message) = eval(&mut sh, "!!");
    assert_eq!(outcome, Outcome::Rejected);
    assert_eq!(message, "No commands in history.\n");

    let line = format!("echo again > {}", out.display());
    assert_eq!(eval(&mut sh, &line).0, Outcome::Completed(0));
    fs::remove_file(&out).unwrap();

    let (outcome, message) = eval(&mut sh, "!!");
    assert_eq!(outcome, Outcome::Completed(0));
    assert_eq!(message, format!("{line}\n"));
    assert_eq!(read(&out), "again\n");
    assert_eq!(sh.previous_line(), Some(line.as_str()));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_failed_program_is_still_remembered() {
    let _lock = lock_processes();
    let mut sh = interpreter();
    assert_eq!(eval(&mut sh, "false").0, Outcome::Completed(1));
    let (outcome, message) = eval(&mut sh, "!!");
    assert_eq!(outcome, Outcome::Completed(1));
    assert_eq!(message, "false\n");
}

#[test]
fn test_background_line_does_not_block() {
    let _lock = lock_processes();
    let dir = temp_dir("background");
    let marker = dir.join("done");
    let mut sh = interpreter();

    let started = Instant::now();
    let (outcome, _) = eval(&mut sh, "sleep 2 &");
    assert!(matches!(outcome, Outcome::Background(_)));
    assert!(started.elapsed() < Duration::from_secs(2));

    let (outcome, _) = eval(&mut sh, &format!("touch {} &", marker.display()));
    assert!(matches!(outcome, Outcome::Background(_)));
    let deadline = Instant::now() + Duration::from_secs(10);
    while !marker.exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(marker.exists());

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_parse_errors_do_not_execute() {
    let _lock = lock_processes();
    let dir = temp_dir("rejected");
    let out = dir.join("out.txt");
    let mut sh = interpreter();

    let line = format!("echo x > {} | cat", out.display());
    let (outcome, message) = eval(&mut sh, &line);
    assert_eq!(outcome, Outcome::Rejected);
    assert!(message.starts_with("Syntax error"));
    assert!(!out.exists());

    let (outcome, message) = eval(&mut sh, "&");
    assert_eq!(outcome, Outcome::Rejected);
    assert!(message.starts_with("Syntax error"));

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_nul_byte_is_an_error() {
    let _lock = lock_processes();
    let mut sh = interpreter();
    let mut out = Vec::new();
    assert!(sh.eval_line_with_output("echo a\0b", &mut out).is_err());
}

#[test]
fn test_endless_producer_stops_when_reader_exits() {
    let _lock = lock_processes();
    let dir = temp_dir("sigpipe");
    let out = dir.join("out.txt");
    let mut sh = interpreter();

    let line = format!("yes | head -n 1 > {}", out.display());
    assert_eq!(eval(&mut sh, &line).0, Outcome::Completed(0));
    assert_eq!(read(&out), "y\n");

    let _ = fs::remove_dir_all(dir);
}

#[cfg(target_os = "linux")]
#[test]
fn test_pipe_descriptors_are_closed_before_exec() {
    let _lock = lock_processes();
    let dir = temp_dir("descriptors");
    let alone = dir.join("alone.txt");
    let piped = dir.join("piped.txt");
    let mut sh = interpreter();

    let line = format!("ls -1 /proc/self/fd > {}", alone.display());
    assert_eq!(eval(&mut sh, &line).0, Outcome::Completed(0));
    let line = format!(
        "ls /proc/self/fd | cat | ls -1 /proc/self/fd > {}",
        piped.display()
    );
    assert_eq!(eval(&mut sh, &line).0, Outcome::Completed(0));

    // A piped stage sees exactly the descriptors a lone stage sees.
    let alone = read(&alone);
    for fd in ["0", "1", "2"] {
        assert!(alone.lines().any(|l| l == fd), "{fd} missing from {alone:?}");
    }
    assert_eq!(read(&piped), alone);

    let _ = fs::remove_dir_all(dir);
}
