use super::*;

fn args(pairs: &[&str]) -> Vec<String> {
    pairs.iter().map(|s| s.to_string()).collect()
}

#[test]
fn version_flag_short_circuits() {
    let outcome = parse(&args(&["--version"])).unwrap();
    assert!(matches!(outcome, ArgsOutcome::PrintVersion));
}

#[test]
fn help_flag_short_circuits() {
    let outcome = parse(&args(&["-h"])).unwrap();
    assert!(matches!(outcome, ArgsOutcome::PrintHelp));
}

#[test]
fn full_flag_set_parses_into_daemon_args() {
    let outcome = parse(&args(&[
        "--name",
        "widgets",
        "--factory-file",
        "/tmp/widgets.factory",
        "--idle-ttl",
        "12.5",
        "--serializer",
        "json",
        "--scope",
        "user",
    ]))
    .unwrap();

    match outcome {
        ArgsOutcome::Run(parsed) => {
            assert_eq!(parsed.name, "widgets");
            assert_eq!(parsed.factory_file, PathBuf::from("/tmp/widgets.factory"));
            assert_eq!(parsed.idle_ttl, Duration::from_secs_f64(12.5));
            assert_eq!(parsed.codec_name, "json");
            assert_eq!(parsed.scope, "user");
        }
        _ => panic!("expected ArgsOutcome::Run"),
    }
}

#[test]
fn serializer_and_scope_default_when_omitted() {
    let outcome = parse(&args(&[
        "--name",
        "widgets",
        "--factory-file",
        "/tmp/widgets.factory",
        "--idle-ttl",
        "5",
    ]))
    .unwrap();

    match outcome {
        ArgsOutcome::Run(parsed) => {
            assert_eq!(parsed.codec_name, "json");
            assert_eq!(parsed.scope, "user");
        }
        _ => panic!("expected ArgsOutcome::Run"),
    }
}

#[yare::parameterized(
    missing_name       = { &["--factory-file", "/tmp/widgets.factory"],                     "--name" },
    malformed_idle_ttl = { &["--name", "widgets", "--factory-file", "/tmp/w.factory",
                             "--idle-ttl", "not-a-number"],                                  "--idle-ttl" },
    unknown_flag       = { &["--bogus", "value"],                                           "--bogus" },
    dangling_flag      = { &["--name"],                                                     "--name" },
)]
fn rejected_argument_lists_surface_the_offending_flag(raw: &[&str], error_fragment: &str) {
    let err = parse(&args(raw)).unwrap_err();
    assert!(err.contains(error_fragment));
}
