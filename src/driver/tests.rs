use super::*;

fn driver_for(args: &str) -> (Driver, bool) {
    let mut driver = Driver::new();
    driver.add_standard_args();
    let ok = driver.parse_command_line(&format!("svfront {args}"));
    (driver, ok)
}

fn temp_source(dir: &tempfile::TempDir, name: &str, text: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path.display().to_string()
}

#[test]
fn standard_args_cover_the_documented_surface() {
    let dir = tempfile::tempdir().unwrap();
    let src = temp_source(&dir, "a.v", "module a; endmodule\n");
    let (driver, ok) = driver_for(&format!(
        "-I inc --isystem sys -y libs -Y sv -D FOO=1 -U BAR --max-include-depth 8 \
         --max-parse-depth 64 --max-lexer-errors 4 -j 2 --max-hierarchy-depth 10 \
         --compat vcs -T min --timescale 10ns/1ps --lint-only --top a -G W=4 \
         -W no-implicit-convert --error-limit 5 --single-unit {src}"
    ));
    assert!(ok);
    let options = &driver.options;
    assert_eq!(options.include_dirs, ["inc"]);
    assert_eq!(options.include_system_dirs, ["sys"]);
    assert_eq!(options.lib_dirs, ["libs"]);
    assert_eq!(options.lib_exts, ["sv"]);
    assert_eq!(options.defines, ["FOO=1"]);
    assert_eq!(options.undefines, ["BAR"]);
    assert_eq!(options.max_include_depth, Some(8));
    assert_eq!(options.max_parse_depth, Some(64));
    assert_eq!(options.max_lexer_errors, Some(4));
    assert_eq!(options.num_threads, Some(2));
    assert_eq!(options.max_instance_depth, Some(10));
    assert_eq!(options.compat.as_deref(), Some("vcs"));
    assert_eq!(options.min_typ_max.as_deref(), Some("min"));
    assert_eq!(options.time_scale.as_deref(), Some("10ns/1ps"));
    assert_eq!(options.only_lint, Some(true));
    assert_eq!(options.top_modules, ["a"]);
    assert_eq!(options.param_overrides, ["W=4"]);
    assert_eq!(options.warning_options, ["no-implicit-convert"]);
    assert_eq!(options.error_limit, Some(5));
    assert_eq!(options.single_unit, Some(true));
    assert_eq!(options.file_patterns, [src]);
}

#[test]
fn unknown_arguments_fail_the_parse() {
    let (driver, ok) = driver_for("--definitely-not-an-option");
    assert!(!ok);
    assert!(!driver.cmd_line.errors().is_empty());
}

#[test]
fn libraries_inherit_macros_requires_single_unit() {
    let (mut driver, ok) = driver_for("--libraries-inherit-macros a.v");
    assert!(ok);
    assert!(!driver.process_options());
}

#[test]
fn libraries_inherit_macros_passes_with_single_unit() {
    let dir = tempfile::tempdir().unwrap();
    let src = temp_source(&dir, "a.v", "module a; endmodule\n");
    let (mut driver, ok) =
        driver_for(&format!("--libraries-inherit-macros --single-unit {src}"));
    assert!(ok);
    assert!(driver.process_options());
}

#[test]
fn invalid_compat_value_fails_validation() {
    let (mut driver, ok) = driver_for("--compat foo a.v");
    assert!(ok);
    assert!(!driver.process_options());
}

#[test]
fn invalid_timing_and_timescale_fail_validation() {
    let (mut driver, ok) = driver_for("-T sometimes a.v");
    assert!(ok);
    assert!(!driver.process_options());

    let (mut driver, ok) = driver_for("--timescale 3ns/1ps a.v");
    assert!(ok);
    assert!(!driver.process_options());
}

#[test]
fn missing_input_files_fail_validation() {
    let (mut driver, ok) = driver_for("-D FOO=1");
    assert!(ok);
    assert!(!driver.process_options());
}

#[test]
fn vcs_compat_defaults_the_fine_grained_options() {
    let (mut driver, _) = driver_for("--compat vcs a.v");
    assert!(driver.process_options());
    assert_eq!(driver.options.allow_hierarchical_const, Some(true));
    assert_eq!(driver.options.allow_use_before_declare, Some(true));
    assert_eq!(driver.options.relax_enum_conversions, Some(true));
}

#[test]
fn vcs_compat_does_not_override_explicit_settings() {
    let (mut driver, _) = driver_for("--compat vcs --relax-enum-conversions=false a.v");
    assert!(driver.process_options());
    assert_eq!(driver.options.relax_enum_conversions, Some(false));
}

#[test]
fn applying_compat_twice_is_idempotent() {
    let (mut driver, _) = driver_for("--compat vcs a.v");
    assert!(driver.process_options());
    let first = driver.options.clone();
    assert!(driver.process_options());
    assert_eq!(
        first.allow_hierarchical_const,
        driver.options.allow_hierarchical_const
    );
    assert_eq!(
        first.relax_enum_conversions,
        driver.options.relax_enum_conversions
    );
    let bag_a = first.create_option_bag();
    let bag_b = driver.options.create_option_bag();
    assert_eq!(
        bag_a.compilation.relax_enum_conversions,
        bag_b.compilation.relax_enum_conversions
    );
}

#[test]
fn lint_only_defaults_ignore_unknown_modules() {
    let (mut driver, _) = driver_for("--lint-only a.v");
    assert!(driver.process_options());
    assert_eq!(driver.options.ignore_unknown_modules, Some(true));

    let (mut driver, _) = driver_for("--lint-only --ignore-unknown-modules=false a.v");
    assert!(driver.process_options());
    assert_eq!(driver.options.ignore_unknown_modules, Some(false));
}

#[test]
fn severity_program_applies_mandatory_overrides() {
    let (mut driver, _) = driver_for("a.v");
    assert!(driver.process_options());
    assert_eq!(
        driver.diag_engine.severity(DiagCode::DuplicateDefinition),
        Severity::Error
    );
    assert_eq!(
        driver.diag_engine.severity(DiagCode::BadProceduralForce),
        Severity::Error
    );
    // Non-compat promotions.
    assert_eq!(driver.diag_engine.severity(DiagCode::IndexOOB), Severity::Error);
    assert_eq!(
        driver.diag_engine.severity(DiagCode::SplitDistWeightOp),
        Severity::Error
    );
}

#[test]
fn vcs_compat_ignores_its_diagnostic_set() {
    let (mut driver, _) = driver_for("--compat vcs a.v");
    assert!(driver.process_options());
    for code in [
        DiagCode::StaticInitializerMustBeExplicit,
        DiagCode::ImplicitConvert,
        DiagCode::BadFinishNum,
        DiagCode::NonstandardSysFunc,
        DiagCode::NonstandardForeach,
        DiagCode::NonstandardDist,
    ] {
        assert_eq!(driver.diag_engine.severity(code), Severity::Ignored);
    }
    // The promotions are compat-gated.
    assert_eq!(
        driver.diag_engine.severity(DiagCode::IndexOOB),
        Severity::Warning
    );
}

#[test]
fn user_warning_options_run_last() {
    let (mut driver, _) = driver_for("-W no-index-oob -W error=unused-definition a.v");
    assert!(driver.process_options());
    assert_eq!(
        driver.diag_engine.severity(DiagCode::IndexOOB),
        Severity::Ignored
    );
    assert_eq!(
        driver.diag_engine.severity(DiagCode::UnusedDefinition),
        Severity::Error
    );
}

#[test]
fn option_bag_reflects_validated_options() {
    let dir = tempfile::tempdir().unwrap();
    let src = temp_source(&dir, "a.v", "module a; endmodule\n");
    let (mut driver, _) = driver_for(&format!("--lint-only --error-limit 7 {src}"));
    assert!(driver.process_options());
    let bag = driver.create_option_bag();
    assert!(bag.compilation.lint_mode);
    assert!(bag.compilation.suppress_unused);
    assert!(bag.compilation.ignore_unknown_modules);
    assert_eq!(bag.compilation.error_limit, 14);
}

#[test]
fn parse_and_compile_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let src = temp_source(&dir, "top.v", "module top; endmodule\n");
    let (mut driver, ok) = driver_for(&src);
    assert!(ok);
    assert!(driver.process_options());
    assert!(driver.parse_all_sources());
    let mut compilation = driver.create_compilation();
    assert_eq!(compilation.top_instances(), vec!["top"]);
    assert_eq!(driver.diag_engine.num_errors(), 0);
}

#[test]
fn missing_modules_resolve_through_library_search_paths() {
    let dir = tempfile::tempdir().unwrap();
    let libdir = dir.path().join("lib");
    std::fs::create_dir(&libdir).unwrap();
    std::fs::write(libdir.join("sub.v"), "module sub; endmodule\n").unwrap();
    let src = temp_source(&dir, "top.v", "module top; sub u(); endmodule\n");

    let (mut driver, ok) = driver_for(&format!("-y {} {src}", libdir.display()));
    assert!(ok);
    assert!(driver.process_options());
    assert!(driver.parse_all_sources());
    let mut compilation = driver.create_compilation();
    assert_eq!(compilation.top_instances(), vec!["top"]);
    let unknown = compilation
        .all_diagnostics()
        .iter()
        .filter(|diag| diag.code == DiagCode::UnknownModule)
        .count();
    assert_eq!(unknown, 0);
}
