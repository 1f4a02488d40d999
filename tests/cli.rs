use assert_cmd::Command;

fn deaduction() -> Command {
    Command::cargo_bin("deaduction").expect("binary exists")
}

#[test]
fn version_and_help_flags() {
    let version = format!("deaduction {}\n", env!("CARGO_PKG_VERSION"));
    for flag in ["--version", "-v"] {
        deaduction().arg(flag).assert().success().stdout(version.clone());
    }
    for flag in ["--help", "-h"] {
        let assert = deaduction().arg(flag).assert().success().stderr("");
        let usage = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
        assert!(usage.starts_with("Usage: deaduction"), "{usage}");
        assert!(usage.contains("--used NAME"), "{usage}");
    }
}

#[test]
fn html_output_marks_used_properties() {
    let assert = deaduction()
        .args(["--html", "--used", "H", "tests/fixtures/goal.txt"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(
        stdout.contains("<span class=\"used_property\">H</span>: "),
        "{stdout}"
    );
}

#[test]
fn goal_file_is_displayed() {
    deaduction()
        .arg("tests/fixtures/goal.txt")
        .assert()
        .success()
        .stdout("X: a set\nA: 𝒫(X)\nH: ∀x ∈ X, x ∈ A\n⊢ ∃y ∈ X, y ∉ A\n")
        .stderr("");
}

#[test]
fn previous_goal_tags_context() {
    deaduction()
        .args(["--previous", "tests/fixtures/previous.txt", "tests/fixtures/goal.txt"])
        .assert()
        .success()
        .stdout("= X: a set\n= A: 𝒫(X)\n+ H: ∀x ∈ X, x ∈ A\n= ⊢ ∃y ∈ X, y ∉ A\n");
}

#[test]
fn text_depth_writes_words() {
    let output = deaduction()
        .args(["--text-depth", "1", "tests/fixtures/goal.txt"])
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("A: a subset of X"), "stdout was: {stdout}");
    assert!(stdout.contains("H: for every x in X, "), "stdout was: {stdout}");
}

#[test]
fn truncated_input_is_reported() {
    let output = deaduction()
        .arg("tests/fixtures/broken.txt")
        .assert()
        .failure()
        .get_output()
        .clone();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unexpected end of input"), "stderr was: {stderr}");
}

#[test]
fn running_with_missing_file_returns_error() {
    let output = deaduction()
        .arg("tests/does-not-exist.txt")
        .assert()
        .failure()
        .get_output()
        .clone();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("failed to read `tests/does-not-exist.txt`"),
        "stderr was: {stderr}"
    );
}
