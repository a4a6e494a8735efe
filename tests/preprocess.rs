use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

fn svfront() -> Command {
    Command::cargo_bin("svfront").expect("svfront binary")
}

fn write(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, text).expect("write fixture");
    path.display().to_string()
}

fn stdout_of(assert: assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}

#[test]
fn preprocess_expands_macros_to_stdout() {
    let dir = tempdir().expect("tempdir");
    let src = write(
        dir.path(),
        "src.v",
        "`define WIDTH 8\nwire [`WIDTH-1:0] bus;\n",
    );

    let output = stdout_of(svfront().args(["-E", &src]).assert().success());
    assert!(output.contains("wire [8-1:0] bus;"), "{output}");
    assert!(!output.contains("`define"), "{output}");
}

#[test]
fn preprocess_comment_and_directive_switches() {
    let dir = tempdir().expect("tempdir");
    let src = write(
        dir.path(),
        "src.v",
        "`define X 1\n// keep me\nwire w = `X;\n",
    );

    let plain = stdout_of(svfront().args(["-E", &src]).assert().success());
    assert!(!plain.contains("keep me"), "{plain}");

    let with_comments =
        stdout_of(svfront().args(["-E", "--comments", &src]).assert().success());
    assert!(with_comments.contains("// keep me"), "{with_comments}");

    let with_directives =
        stdout_of(svfront().args(["-E", "--directives", &src]).assert().success());
    assert!(with_directives.contains("`define X 1"), "{with_directives}");
}

#[test]
fn preprocess_round_trips_modulo_whitespace() {
    // Feeding the preprocessor its own output yields the same token stream.
    let dir = tempdir().expect("tempdir");
    let src = write(
        dir.path(),
        "src.v",
        "`define W 4\nmodule m; // note\nwire [`W:0] x = 4'b1010;\nendmodule\n",
    );

    let first = stdout_of(svfront().args(["-E", &src]).assert().success());
    let again = write(dir.path(), "again.v", &first);
    let second = stdout_of(svfront().args(["-E", &again]).assert().success());

    let first_tokens: Vec<&str> = first.split_whitespace().collect();
    let second_tokens: Vec<&str> = second.split_whitespace().collect();
    assert_eq!(first_tokens, second_tokens);
}

#[test]
fn preprocess_errors_suppress_output() {
    let dir = tempdir().expect("tempdir");
    let src = write(dir.path(), "src.v", "`include \"missing.vh\"\nwire w;\n");

    let assert = svfront()
        .args(["-E", &src])
        .assert()
        .failure()
        .stderr(contains("could not find or open include file"));
    let output = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(output.is_empty(), "{output}");
}

#[test]
fn obfuscation_rewrites_identifiers_but_not_vector_digits() {
    // The digits after a base stay verbatim; names rewrite consistently.
    let dir = tempdir().expect("tempdir");
    let src = write(
        dir.path(),
        "src.v",
        "module m; wire [3:0] x = 4'b1010; assign x = x; endmodule\n",
    );

    let output = stdout_of(
        svfront()
            .args(["-E", "--obfuscate", "--fixed-seed", &src])
            .assert()
            .success(),
    );
    assert!(output.contains("4'b1010"), "{output}");
    assert!(!output.contains(" x "), "{output}");
    assert!(!output.contains("module m;"), "{output}");

    // Consistency: the two uses of `x` in the assign rewrite identically.
    let assign_part = output
        .split("assign")
        .nth(1)
        .expect("assign statement survives");
    let words: Vec<&str> = assign_part
        .split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|word| word.len() == 16)
        .collect();
    assert_eq!(words.len(), 2, "{output}");
    assert_eq!(words[0], words[1], "{output}");
}

#[test]
fn fixed_seed_obfuscation_is_deterministic_across_runs() {
    let dir = tempdir().expect("tempdir");
    let src = write(dir.path(), "src.v", "module alpha; wire beta; endmodule\n");

    let first = stdout_of(
        svfront()
            .args(["-E", "--obfuscate", "--fixed-seed", &src])
            .assert()
            .success(),
    );
    let second = stdout_of(
        svfront()
            .args(["-E", "--obfuscate", "--fixed-seed", &src])
            .assert()
            .success(),
    );
    assert_eq!(first, second);

    // Keywords survive untouched.
    assert!(first.contains("module "), "{first}");
    assert!(first.contains("endmodule"), "{first}");
}

#[test]
fn macros_only_reports_signatures_and_bodies() {
    let dir = tempdir().expect("tempdir");
    let src = write(
        dir.path(),
        "src.v",
        "`define PLAIN 42\n`define PAIR(a, b = 1) a + b\n`define EMPTY\n",
    );

    let output = stdout_of(svfront().args(["--macros-only", &src]).assert().success());
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3, "{output}");
    assert_eq!(lines[0], "PLAIN 42");
    assert_eq!(lines[1], "PAIR(a, b = 1) a + b");
    assert_eq!(lines[2], "EMPTY");
}

#[test]
fn predefines_reach_the_preprocessed_output() {
    let dir = tempdir().expect("tempdir");
    let src = write(dir.path(), "src.v", "wire [`FROM_CLI:0] w;\n");

    let output = stdout_of(
        svfront()
            .args(["-D", "FROM_CLI=7", "-E", &src])
            .assert()
            .success(),
    );
    assert!(output.contains("wire [7:0] w;"), "{output}");
}

#[test]
fn undefine_removes_command_line_macros() {
    let dir = tempdir().expect("tempdir");
    let src = write(
        dir.path(),
        "src.v",
        "`ifdef GONE\nwire seen;\n`else\nwire hidden;\n`endif\n",
    );

    let output = stdout_of(
        svfront()
            .args(["-D", "GONE=1", "-U", "GONE", "-E", &src])
            .assert()
            .success(),
    );
    assert!(output.contains("hidden"), "{output}");
    assert!(!output.contains("seen"), "{output}");
}

#[test]
fn ignored_directives_are_dropped_with_their_arguments() {
    let dir = tempdir().expect("tempdir");
    let src = write(
        dir.path(),
        "src.v",
        "`protect some args here\nwire w;\n",
    );

    let output = stdout_of(
        svfront()
            .args(["--ignore-directive", "protect", "-E", &src])
            .assert()
            .success(),
    );
    assert!(output.contains("wire w;"), "{output}");
    assert!(!output.contains("protect"), "{output}");
}
