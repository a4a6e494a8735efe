#![deny(unsafe_code)]
#![deny(warnings)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

use std::process::ExitCode;

use svfront::cli::OptionKind;
use svfront::logging::{init_logging, LogOptions};
use svfront::Driver;

const OVERVIEW: &str = "svfront SystemVerilog front-end";

fn main() -> ExitCode {
    if run_with_args(std::env::args()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run_with_args<I, S>(args: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    use std::io::IsTerminal;

    let mut driver = Driver::new();
    driver.add_standard_args();
    add_tool_args(&mut driver);

    let joined = join_args(args);
    if !driver.parse_command_line(&joined) {
        return false;
    }

    // Log styling follows the diagnostic color policy: an explicit
    // --color-diagnostics wins, otherwise terminal detection decides.
    let use_ansi = driver.options.color_diags.unwrap_or_else(|| {
        std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
    });
    init_logging(&LogOptions::from_env(), use_ansi);

    let cmd = &driver.cmd_line;
    if cmd.flag("-h") == Some(true) {
        println!("{}", cmd.help_text(OVERVIEW));
        return true;
    }
    if cmd.flag("--version") == Some(true) {
        println!("svfront version {}", env!("CARGO_PKG_VERSION"));
        return true;
    }

    if !driver.process_options() {
        return false;
    }

    let cmd = &driver.cmd_line;
    let quiet = cmd.flag("-q") == Some(true);
    let preprocess = cmd.flag("-E") == Some(true);
    let macros_only = cmd.flag("--macros-only") == Some(true);
    let parse_only = cmd.flag("--parse-only") == Some(true);
    let include_comments = cmd.flag("--comments") == Some(true);
    let include_directives = cmd.flag("--directives") == Some(true);
    let obfuscate = cmd.flag("--obfuscate") == Some(true);
    let fixed_seed = cmd.flag("--fixed-seed") == Some(true);

    if preprocess {
        driver.run_preprocessor(include_comments, include_directives, obfuscate, fixed_seed)
    } else if macros_only {
        driver.report_macros();
        !driver.any_failed_loads()
    } else if parse_only {
        driver.parse_all_sources() && driver.report_parse_diags()
    } else if driver.parse_all_sources() {
        let mut compilation = driver.create_compilation();
        driver.report_compilation(&mut compilation, quiet)
    } else {
        false
    }
}

fn add_tool_args(driver: &mut Driver) {
    let cmd = &mut driver.cmd_line;
    cmd.add("-h,--help", OptionKind::Flag, "Display available options", None, false);
    cmd.add(
        "--version",
        OptionKind::Flag,
        "Display version information and exit",
        None,
        false,
    );
    cmd.add(
        "-q,--quiet",
        OptionKind::Flag,
        "Suppress non-essential output",
        None,
        false,
    );
    cmd.add(
        "-E,--preprocess",
        OptionKind::Flag,
        "Only run the preprocessor (and print preprocessed files to stdout)",
        None,
        false,
    );
    cmd.add(
        "--macros-only",
        OptionKind::Flag,
        "Print a list of found macros and exit",
        None,
        false,
    );
    cmd.add(
        "--parse-only",
        OptionKind::Flag,
        "Stop after parsing input files, don't perform elaboration or type checking",
        None,
        false,
    );
    cmd.add(
        "--comments",
        OptionKind::Flag,
        "Include comments in preprocessed output (with -E)",
        None,
        false,
    );
    cmd.add(
        "--directives",
        OptionKind::Flag,
        "Include compiler directives in preprocessed output (with -E)",
        None,
        false,
    );
    cmd.add(
        "--obfuscate",
        OptionKind::Flag,
        "Randomize all identifiers in preprocessed output (with -E)",
        None,
        false,
    );
    cmd.add(
        "--fixed-seed",
        OptionKind::Flag,
        "Use a fixed random seed for identifier obfuscation (with -E --obfuscate)",
        None,
        false,
    );
}

/// Join process arguments back into one parseable string, quoting anything
/// the tokenizer would otherwise split or interpret.
fn join_args<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut joined = String::new();
    for arg in args {
        let arg = arg.into();
        if !joined.is_empty() {
            joined.push(' ');
        }
        if arg.is_empty()
            || arg
                .chars()
                .any(|ch| ch.is_whitespace() || matches!(ch, '"' | '\'' | '\\' | '#'))
        {
            joined.push('"');
            for ch in arg.chars() {
                if matches!(ch, '"' | '\\') {
                    joined.push('\\');
                }
                joined.push(ch);
            }
            joined.push('"');
        } else {
            joined.push_str(&arg);
        }
    }
    joined
}
