use std::fs;

use super::*;

fn schema() -> CommandLine {
    let mut cmd = CommandLine::new();
    cmd.add(
        "-I,--include-directory,+incdir",
        OptionKind::List(ValueKind::Text),
        "Additional include search paths",
        Some("<dir>"),
        true,
    );
    cmd.add(
        "-D,--define-macro,+define",
        OptionKind::List(ValueKind::Text),
        "Define <macro> to <value>",
        Some("<macro>=<value>"),
        false,
    );
    cmd.add(
        "--compat",
        OptionKind::Scalar(ValueKind::Text),
        "Compatibility profile",
        Some("vcs"),
        false,
    );
    cmd.add(
        "-j,--threads",
        OptionKind::Scalar(ValueKind::UInt),
        "Parse thread count",
        Some("<count>"),
        false,
    );
    cmd.add("--single-unit", OptionKind::Flag, "Single unit", None, false);
    cmd.add_ignore_option("--cmd-ignore", "Ignore rule", "<vendor_cmd>,<N>");
    cmd.add_rename_option("--cmd-rename", "Rename rule", "<vendor_cmd>,<canonical>");
    cmd.add_command_file_option("-f", "Command file");
    cmd.add_command_file_option("-F", "Command file, relative paths");
    cmd.set_positional("files");
    cmd
}

fn parse(cmd: &mut CommandLine, line: &str) -> bool {
    cmd.parse(line, ParseOptions::default())
}

#[test]
fn program_name_is_skipped_by_default() {
    let mut cmd = schema();
    assert!(parse(&mut cmd, "tool a.v b.v"));
    assert_eq!(cmd.program_name(), "tool");
    assert_eq!(cmd.positionals(), ["a.v", "b.v"]);
}

#[test]
fn long_short_and_vendor_forms_bind_one_entry() {
    let mut cmd = schema();
    assert!(parse(
        &mut cmd,
        "tool -I one --include-directory=two +incdir+three+four"
    ));
    assert_eq!(cmd.list("-I"), ["one", "two", "three", "four"]);
    assert_eq!(cmd.list("--include-directory"), ["one", "two", "three", "four"]);
}

#[test]
fn scalar_duplicates_error_without_ignore_policy() {
    let mut cmd = schema();
    assert!(!parse(&mut cmd, "tool --compat vcs --compat vcs"));
    assert_eq!(
        cmd.errors(),
        ["error: more than one value provided for argument '--compat'"]
    );
    assert_eq!(cmd.scalar("--compat"), Some("vcs"));
}

#[test]
fn numeric_options_validate_at_bind_time() {
    let mut cmd = schema();
    assert!(!parse(&mut cmd, "tool --threads four"));
    assert_eq!(
        cmd.errors(),
        ["error: invalid value 'four' for argument '--threads', expected an integer"]
    );

    let mut cmd = schema();
    assert!(parse(&mut cmd, "tool -j 4"));
    assert_eq!(cmd.uint("--threads"), Some(4));
}

#[test]
fn unknown_options_accumulate_errors() {
    let mut cmd = schema();
    assert!(!parse(&mut cmd, "tool -z --whatever a.v"));
    assert_eq!(cmd.errors().len(), 2);
    assert_eq!(cmd.positionals(), ["a.v"]);
}

#[test]
fn flags_accept_explicit_boolean() {
    let mut cmd = schema();
    assert!(parse(&mut cmd, "tool --single-unit=false"));
    assert_eq!(cmd.flag("--single-unit"), Some(false));

    let mut cmd = schema();
    assert!(parse(&mut cmd, "tool --single-unit"));
    assert_eq!(cmd.flag("--single-unit"), Some(true));
}

#[test]
fn vendor_ignore_rules_consume_arguments() {
    let mut cmd = schema();
    assert!(parse(
        &mut cmd,
        "tool --cmd-ignore +acc,1 +acc rwc a.v +acc+rb b.v"
    ));
    // +acc consumes one following token; +acc+rb carries its argument inline.
    assert_eq!(cmd.positionals(), ["a.v", "b.v"]);
}

#[test]
fn vendor_rename_rules_redirect_to_canonical_options() {
    let mut cmd = schema();
    assert!(parse(&mut cmd, "tool --cmd-rename +macro,+define +macro+FOO=1"));
    assert_eq!(cmd.list("-D"), ["FOO=1"]);
}

#[test]
fn rename_to_unknown_option_is_an_error() {
    let mut cmd = schema();
    assert!(!parse(&mut cmd, "tool --cmd-rename +macro,--nope"));
    assert!(cmd.errors()[0].contains("unknown target option"));
}

#[test]
fn parsing_is_deterministic_for_the_same_input() {
    let line = "tool -I inc -D A=1 --compat vcs top.v";
    let mut first = schema();
    let mut second = schema();
    assert!(parse(&mut first, line));
    assert!(parse(&mut second, line));
    assert_eq!(first.positionals(), second.positionals());
    assert_eq!(first.list("-I"), second.list("-I"));
    assert_eq!(first.scalar("--compat"), second.scalar("--compat"));
}

#[test]
fn command_files_splice_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("extra.f");
    fs::write(&file, "# a comment\n-D FROM_FILE=1\nmid.v /* block */\n").unwrap();

    let mut cmd = schema();
    let line = format!("tool pre.v -f {} post.v", file.display());
    assert!(parse(&mut cmd, &line));
    assert_eq!(cmd.positionals(), ["pre.v", "mid.v", "post.v"]);
    assert_eq!(cmd.list("-D"), ["FROM_FILE=1"]);
}

#[test]
fn missing_command_file_reports_and_flags_failure() {
    let mut cmd = schema();
    assert!(!parse(&mut cmd, "tool -f /no/such/file.f"));
    assert!(cmd.any_failed_files());
    assert_eq!(
        cmd.errors(),
        ["error: unable to find or open file: '/no/such/file.f'"]
    );
}

#[test]
fn relative_file_paths_resolve_against_capital_f_parent() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("lists");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("cmd.f"), "foo.v -I inc\n").unwrap();

    let mut cmd = schema();
    let line = format!("tool -F {}", sub.join("cmd.f").display());
    assert!(parse(&mut cmd, &line));

    let canonical = fs::canonicalize(&sub).unwrap();
    assert_eq!(
        cmd.positionals(),
        [canonical.join("foo.v").to_string_lossy().into_owned()]
    );
    assert_eq!(
        cmd.list("-I"),
        [canonical.join("inc").to_string_lossy().into_owned()]
    );
}

#[test]
fn lowercase_f_keeps_invocation_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cmd.f");
    fs::write(&file, "foo.v\n").unwrap();

    let mut cmd = schema();
    let line = format!("tool -f {}", file.display());
    assert!(parse(&mut cmd, &line));
    assert_eq!(cmd.positionals(), ["foo.v"]);
}

#[test]
fn nested_command_files_are_supported() {
    let dir = tempfile::tempdir().unwrap();
    let inner = dir.path().join("inner.f");
    let outer = dir.path().join("outer.f");
    fs::write(&inner, "inner.v\n").unwrap();
    fs::write(&outer, format!("outer.v\n-f {}\n", inner.display())).unwrap();

    let mut cmd = schema();
    let line = format!("tool -f {}", outer.display());
    assert!(parse(&mut cmd, &line));
    assert_eq!(cmd.positionals(), ["outer.v", "inner.v"]);
}

#[test]
fn duplicate_scalars_from_command_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cmd.f");
    fs::write(&file, "--compat vcs\n").unwrap();

    let mut cmd = schema();
    let line = format!("tool --compat vcs -f {}", file.display());
    assert!(parse(&mut cmd, &line));
    assert_eq!(cmd.scalar("--compat"), Some("vcs"));
}

#[test]
fn self_referential_command_files_hit_the_depth_cut() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("loop.f");
    fs::write(&file, format!("-f {}\n", file.display())).unwrap();

    let mut cmd = schema();
    let line = format!("tool -f {}", file.display());
    assert!(!parse(&mut cmd, &line));
    assert!(cmd.any_failed_files());
    assert!(cmd
        .errors()
        .iter()
        .any(|err| err.contains("nesting is too deep")));
}

#[test]
fn help_text_lists_registered_options() {
    let mut cmd = schema();
    let _ = parse(&mut cmd, "tool");
    let help = cmd.help_text("overview");
    assert!(help.contains("USAGE: tool"));
    assert!(help.contains("-I,--include-directory,+incdir <dir>"));
    assert!(help.contains("Additional include search paths"));
}
