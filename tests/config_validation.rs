// tests/config_validation.rs

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;

use devpipe::config::{
    build_project, load_and_validate, load_from_path, PathSetConfig, RawConfigFile,
};
use devpipe::errors::DevpipeError;
use devpipe::fs::mock::MockFileSystem;
use devpipe::types::{BuildMode, PathSetKind};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const ROOT: &str = "/proj";

fn mock_with_package() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(
        "/proj/package.json",
        r#"{ "name": "simple", "version": "1.2.3", "private": true }"#,
    );
    fs
}

fn build(raw: RawConfigFile, fs: &MockFileSystem) -> devpipe::errors::Result<devpipe::config::ProjectConfig> {
    build_project(raw, Path::new(ROOT), BuildMode::Development, fs)
}

fn expect_config_error(result: devpipe::errors::Result<devpipe::config::ProjectConfig>, needle: &str) {
    match result {
        Err(DevpipeError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} should mention {needle:?}");
        }
        Err(e) => panic!("Expected ConfigError, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn defaults_reproduce_standard_layout() -> TestResult {
    let fs = mock_with_package();
    let cfg = build(RawConfigFile::default(), &fs)?;

    assert_eq!(cfg.root(), Path::new("/proj"));
    assert_eq!(cfg.dist(), Path::new("/proj/dist"));
    assert_eq!(cfg.out(), Path::new("/proj/out"));
    assert_eq!(cfg.package().name, "simple");
    assert_eq!(cfg.package().version, "1.2.3");

    let source = cfg.source_set();
    assert_eq!(source.name(), "core");
    assert_eq!(source.kind(), PathSetKind::Source);
    assert_eq!(source.dest(), None);
    assert_eq!(source.debounce(), Duration::from_millis(500));

    let statics: Vec<_> = cfg.static_sets().collect();
    assert_eq!(statics.len(), 1);
    assert_eq!(statics[0].name(), "static_html");
    assert_eq!(statics[0].dest(), Some(Path::new("/proj/dist")));

    let bundle = cfg.bundle();
    assert_eq!(bundle.entry, PathBuf::from("/proj/out/index.js"));
    assert_eq!(bundle.outfile, PathBuf::from("/proj/dist/simple.umd.js"));
    assert_eq!(bundle.global_name, "simple");
    assert_eq!(bundle.target, "es2015");
    assert!(bundle.sourcemap);

    assert!(cfg.compile().args.contains(&"/proj/tsconfig.json".to_string()));
    assert!(cfg.compile().args.contains(&"/proj/out".to_string()));
    Ok(())
}

#[test]
fn banner_has_name_and_version() -> TestResult {
    let fs = mock_with_package();
    let cfg = build(RawConfigFile::default(), &fs)?;
    assert_eq!(
        cfg.package().banner(),
        "/*! @preserve\n * simple\n * version: 1.2.3\n */"
    );
    Ok(())
}

#[test]
fn missing_package_json_is_config_error() {
    let fs = MockFileSystem::new();
    expect_config_error(build(RawConfigFile::default(), &fs), "package.json");
}

#[test]
fn malformed_package_json_is_config_error() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/package.json", "{ not json");
    expect_config_error(build(RawConfigFile::default(), &fs), "malformed");

    let fs = MockFileSystem::new();
    fs.add_file("/proj/package.json", r#"{ "name": "simple" }"#);
    expect_config_error(build(RawConfigFile::default(), &fs), "version");
}

#[test]
fn unreadable_package_json_is_io_error() {
    let fs = mock_with_package();
    fs.fail_on("/proj/package.json", std::io::ErrorKind::PermissionDenied);
    match build(RawConfigFile::default(), &fs) {
        Err(DevpipeError::IoError { path, .. }) => {
            assert_eq!(path, PathBuf::from("/proj/package.json"));
        }
        other => panic!("Expected IoError, got: {other:?}"),
    }
}

#[test]
fn exactly_one_source_set_is_required() {
    let fs = mock_with_package();

    let mut raw = RawConfigFile::default();
    raw.path_set.insert(
        "html".to_string(),
        PathSetConfig::new(PathSetKind::Static, &["src/*.html"]),
    );
    expect_config_error(build(raw, &fs), "source");

    let mut raw = RawConfigFile::default();
    raw.path_set.insert("a".to_string(), PathSetConfig::new(PathSetKind::Source, &["src/**/*.ts"]));
    raw.path_set.insert("b".to_string(), PathSetConfig::new(PathSetKind::Source, &["lib/**/*.ts"]));
    expect_config_error(build(raw, &fs), "more than one source");
}

#[test]
fn path_set_needs_an_include_pattern() {
    let fs = mock_with_package();
    let mut raw = RawConfigFile::default();
    raw.path_set.insert("core".to_string(), PathSetConfig::new(PathSetKind::Source, &["src/**/*.ts"]));
    raw.path_set.insert(
        "only_excludes".to_string(),
        PathSetConfig::new(PathSetKind::Static, &["!src/*.css"]),
    );
    expect_config_error(build(raw, &fs), "at least one include pattern");
}

#[test]
fn invalid_glob_is_config_error() {
    let fs = mock_with_package();
    let mut raw = RawConfigFile::default();
    raw.path_set.insert("core".to_string(), PathSetConfig::new(PathSetKind::Source, &["src/[*.ts"]));
    expect_config_error(build(raw, &fs), "src/[*.ts");
}

#[test]
fn output_dirs_must_not_nest_or_escape() {
    let fs = mock_with_package();

    let mut raw = RawConfigFile::default();
    raw.project.out = "dist/out".to_string();
    expect_config_error(build(raw, &fs), "must not overlap");

    let mut raw = RawConfigFile::default();
    raw.project.dist = ".".to_string();
    expect_config_error(build(raw, &fs), "inside the project root");

    let mut raw = RawConfigFile::default();
    raw.project.dist = "../elsewhere".to_string();
    expect_config_error(build(raw, &fs), "..");
}

#[test]
fn static_set_cannot_shadow_bundle() {
    let fs = mock_with_package();
    let mut raw = RawConfigFile::default();
    raw.path_set.insert("core".to_string(), PathSetConfig::new(PathSetKind::Source, &["src/**/*.ts"]));
    raw.path_set.insert(
        "vendor".to_string(),
        PathSetConfig::new(PathSetKind::Static, &["vendor/*.js"]),
    );
    expect_config_error(build(raw, &fs), "bundle artifact");
}

#[test]
fn static_set_cannot_copy_into_out() {
    let fs = mock_with_package();
    let mut raw = RawConfigFile::default();
    raw.path_set.insert("core".to_string(), PathSetConfig::new(PathSetKind::Source, &["src/**/*.ts"]));
    let mut html = PathSetConfig::new(PathSetKind::Static, &["src/*.html"]);
    html.dest = Some("out/pages".to_string());
    raw.path_set.insert("html".to_string(), html);
    expect_config_error(build(raw, &fs), "overlaps the compiler output");
}

#[test]
fn per_set_debounce_overrides_default() -> TestResult {
    let fs = mock_with_package();
    let mut raw = RawConfigFile::default();
    raw.watch.debounce = "2s".to_string();
    let mut core = PathSetConfig::new(PathSetKind::Source, &["src/**/*.ts"]);
    core.debounce = Some("50ms".to_string());
    raw.path_set.insert("core".to_string(), core);
    raw.path_set.insert(
        "html".to_string(),
        PathSetConfig::new(PathSetKind::Static, &["src/*.html"]),
    );

    let cfg = build(raw, &fs)?;
    assert_eq!(cfg.source_set().debounce(), Duration::from_millis(50));
    assert_eq!(
        cfg.path_set("html").map(|s| s.debounce()),
        Some(Duration::from_secs(2))
    );
    Ok(())
}

#[test]
fn bad_duration_is_config_error() {
    let fs = mock_with_package();
    let mut raw = RawConfigFile::default();
    raw.watch.debounce = "soon".to_string();
    expect_config_error(build(raw, &fs), "debounce");
}

#[test]
fn production_mode_is_carried() -> TestResult {
    let fs = mock_with_package();
    let cfg = build_project(RawConfigFile::default(), Path::new(ROOT), BuildMode::Production, &fs)?;
    assert!(cfg.mode().minify());
    Ok(())
}

#[test]
fn toml_file_is_parsed() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[project]
dist = "public"

[bundle]
outfile = "app.js"
global_name = "App"

[serve]
port = 8080

[path_set.core]
kind = "source"
patterns = ["src/**/*.ts", "!src/**/*.test.ts"]

[path_set.assets]
kind = "static"
patterns = ["src/assets/**"]
dest = "public/assets"
use_hash = true
"#
    )?;

    let raw = load_from_path(file.path())?;
    assert_eq!(raw.project.dist, "public");
    assert_eq!(raw.serve.port, 8080);
    assert_eq!(raw.bundle.global_name.as_deref(), Some("App"));
    assert_eq!(raw.path_set.len(), 2);
    assert!(raw.path_set["assets"].use_hash);

    let fs = mock_with_package();
    let cfg = build(raw, &fs)?;
    assert_eq!(cfg.bundle().outfile, PathBuf::from("/proj/public/app.js"));
    assert_eq!(cfg.bundle().global_name, "App");
    let assets = cfg.path_set("assets").ok_or("assets set missing")?;
    assert_eq!(assets.dest(), Some(Path::new("/proj/public/assets")));
    assert!(assets.use_hash());
    assert!(!cfg.source_set().matcher().matches("src/a.test.ts"));
    assert!(cfg.source_set().matcher().matches("src/a.ts"));
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[project]
dist = "dist"
colour = "blue"
"#
    )?;

    match load_from_path(file.path()) {
        Err(DevpipeError::TomlError(_)) => Ok(()),
        other => panic!("Expected TomlError, got: {other:?}"),
    }
}

#[test]
fn explicit_missing_config_file_is_an_error() {
    let result = load_and_validate("/definitely/not/here/Devpipe.toml", true, BuildMode::Development);
    match result {
        Err(DevpipeError::ConfigError(msg)) => assert!(msg.contains("does not exist")),
        other => panic!("Expected ConfigError, got: {other:?}"),
    }
}
