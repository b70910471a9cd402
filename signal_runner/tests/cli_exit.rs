use std::process::Command;

fn runner() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_signal_runner"));
    cmd.env_remove("AMBU_CONFIG").env("RUST_LOG", "off");
    cmd
}

#[test]
fn missing_source_prints_error_and_exits_with_one() {
    let output = runner().output().expect("run signal_runner");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Please provide either -p/--path for video or -l/--live for webcam."),
        "stderr was: {stderr}"
    );
}

#[test]
fn path_and_live_together_are_rejected() {
    let output = runner()
        .args(["--path", "clip.mp4", "--live"])
        .output()
        .expect("run signal_runner");

    assert!(!output.status.success());
}

fn run_missing_clip() -> (std::process::Output, String) {
    let output = runner()
        .args(["--path", "/nonexistent/clip.mp4", "--headless", "--no-server"])
        .output()
        .expect("run signal_runner");
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    (output, stderr)
}

#[cfg(feature = "opencv")]
#[test]
fn unreadable_source_reports_the_capture_failure() {
    let (output, stderr) = run_missing_clip();

    assert!(!output.status.success());
    assert!(
        stderr.contains("could not open file /nonexistent/clip.mp4"),
        "stderr was: {stderr}"
    );
    assert!(!stderr.contains("without the `opencv` feature"), "stderr was: {stderr}");
}

#[cfg(not(feature = "opencv"))]
#[test]
fn build_without_opencv_says_so() {
    let (output, stderr) = run_missing_clip();

    assert!(!output.status.success());
    assert!(stderr.contains("without the `opencv` feature"), "stderr was: {stderr}");
}
