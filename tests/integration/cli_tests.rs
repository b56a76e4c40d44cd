use clap::Parser;
use dupfind::cli::{Cli, Commands};
use dupfind::error::ExitCode;
use dupfind::run_app;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Parse arguments with an isolated config file and the colour disabled.
fn cli(config_dir: &TempDir, args: &[&str]) -> Cli {
    let config = config_dir.path().join("config.json");
    let mut argv = vec![
        "dupfind".to_string(),
        "-q".to_string(),
        "--no-color".to_string(),
        "--config".to_string(),
        config.to_string_lossy().into_owned(),
    ];
    argv.extend(args.iter().map(ToString::to_string));
    Cli::try_parse_from(argv).unwrap()
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_compare_exit_codes() {
    let config = tempdir().unwrap();
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"unique one").unwrap();
    fs::write(dir.path().join("b"), b"unique two").unwrap();
    let root = path_arg(dir.path());

    let code = run_app(cli(&config, &["compare", &root])).unwrap();
    assert_eq!(code, ExitCode::NothingFound);

    fs::write(dir.path().join("c"), b"unique one").unwrap();
    let code = run_app(cli(&config, &["compare", &root, "--hash"])).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_compare_json_output() {
    let config = tempdir().unwrap();
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"same").unwrap();
    fs::write(dir.path().join("b.txt"), b"same").unwrap();
    let root = path_arg(dir.path());

    let code = run_app(cli(&config, &["compare", &root, "--output", "json"])).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_compare_missing_root_is_an_error() {
    let config = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let missing = path_arg(&dir.path().join("missing"));

    let err = run_app(cli(&config, &["compare", &missing])).unwrap_err();
    assert!(format!("{:#}", err).contains("missing"));
}

#[test]
fn test_invalid_digest_is_an_error() {
    let config = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let root = path_arg(dir.path());

    let err = run_app(cli(&config, &["search", "-p", &root, "--hash", "XYZ"])).unwrap_err();
    assert!(err.to_string().contains("Invalid digest"));
}

#[test]
fn test_inverted_size_range_is_an_error() {
    let config = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let root = path_arg(dir.path());

    let result = run_app(cli(
        &config,
        &["compare", &root, "--min-size", "10KB", "--max-size", "1KB"],
    ));
    assert!(result.is_err());
}

#[test]
fn test_search_exit_codes() {
    let config = tempdir().unwrap();
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), b"remember the milk").unwrap();
    let root = path_arg(dir.path());

    let code = run_app(cli(&config, &["search", "*.txt", "-p", &root, "--content", "milk"])).unwrap();
    assert_eq!(code, ExitCode::Success);

    let code = run_app(cli(&config, &["search", "*.txt", "-p", &root, "--content", "eggs"])).unwrap();
    assert_eq!(code, ExitCode::NothingFound);

    let code = run_app(cli(
        &config,
        &["search", "-p", &root, "--print-hash", "--print-size", "--group-by", "size"],
    ))
    .unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_config_file_is_honoured() {
    let config = tempdir().unwrap();
    fs::write(
        config.path().join("config.json"),
        r#"{ "legacy_walker": true, "hash_algorithm": "blake3", "threads": 2 }"#,
    )
    .unwrap();
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("x"), b"dup").unwrap();
    fs::write(dir.path().join("y"), b"dup").unwrap();
    let root = path_arg(dir.path());

    let code = run_app(cli(&config, &["compare", &root, "--hash"])).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_parse_compare_mask_lists() {
    let config = tempdir().unwrap();
    let parsed = cli(
        &config,
        &["compare", "--exclude-files", "*.tmp,*.bak", "--include-dirs", "src"],
    );

    match parsed.command {
        Commands::Compare(args) => {
            assert_eq!(args.masks.exclude_files, vec!["*.tmp", "*.bak"]);
            assert_eq!(args.masks.include_dirs, vec!["src"]);
        }
        Commands::Search(_) => panic!("Expected Compare command"),
    }
}
