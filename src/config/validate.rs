// src/config/validate.rs

use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::config::duration::parse_duration;
use crate::config::model::{default_path_sets, RawConfigFile};
use crate::config::project::{
    BundleSettings, CompileSettings, PackageInfo, PathSet, ProjectConfig, ServeSettings,
};
use crate::errors::{DevpipeError, Result};
use crate::fs::FileSystem;
use crate::types::{BuildMode, PathSetKind};
use crate::watch::path_utils::paths_overlap;
use crate::watch::patterns::{glob_base, PathSetMatcher};

#[derive(Debug, Deserialize)]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
}

fn config_error(msg: impl Into<String>) -> DevpipeError {
    DevpipeError::ConfigError(msg.into())
}

/// Turn a raw config into a validated [`ProjectConfig`].
///
/// - `base_dir` is the directory the config file lives in; `project.root` is
///   resolved against it.
/// - `package.json` is read through `fs` for the bundle banner.
///
/// Checks:
/// - output directories are not the project root and do not nest,
/// - every path-set has at least one include pattern and valid globs,
/// - there is exactly one source path-set,
/// - no static path-set can overwrite the bundle artifact,
/// - duration strings parse.
pub fn build_project(
    raw: RawConfigFile,
    base_dir: &Path,
    mode: BuildMode,
    fs: &dyn FileSystem,
) -> Result<ProjectConfig> {
    let root = if raw.project.root == "." {
        base_dir.to_path_buf()
    } else {
        base_dir.join(&raw.project.root)
    };
    let dist = join_clean(&root, &raw.project.dist)?;
    let out = join_clean(&root, &raw.project.out)?;
    let tsconfig = join_clean(&root, &raw.project.tsconfig)?;

    validate_output_dirs(&root, &dist, &out)?;

    let package = read_package_info(fs, &join_clean(&root, &raw.project.package_json)?)?;

    let default_debounce = parse_duration(&raw.watch.debounce)
        .map_err(|e| config_error(format!("[watch].debounce: {e}")))?;

    let raw_sets = if raw.path_set.is_empty() {
        default_path_sets()
    } else {
        raw.path_set
    };

    let mut path_sets = Vec::with_capacity(raw_sets.len());
    for (name, set) in raw_sets {
        if !set.patterns.iter().any(|p| !p.trim().starts_with('!')) {
            return Err(config_error(format!(
                "path-set '{name}' needs at least one include pattern"
            )));
        }

        let matcher = PathSetMatcher::compile(&name, &set.patterns)
            .map_err(|e| config_error(format!("{e:#}")))?;

        let dest = match (set.kind, set.dest.as_deref()) {
            (PathSetKind::Static, Some(dest)) => Some(join_clean(&root, dest)?),
            (PathSetKind::Static, None) => Some(dist.clone()),
            (PathSetKind::Source, None) => None,
            (PathSetKind::Source, Some(_)) => {
                return Err(config_error(format!(
                    "source path-set '{name}' cannot have a `dest`"
                )));
            }
        };

        if let Some(dest) = &dest {
            if paths_overlap(dest, &out) {
                return Err(config_error(format!(
                    "static path-set '{name}' copies into {dest:?}, which overlaps the compiler output {out:?}"
                )));
            }
        }

        let debounce = match set.debounce.as_deref() {
            Some(s) => parse_duration(s)
                .map_err(|e| config_error(format!("[path_set.{name}].debounce: {e}")))?,
            None => default_debounce,
        };

        path_sets.push(PathSet::new(
            name,
            set.kind,
            matcher,
            dest,
            set.use_hash,
            debounce,
        ));
    }

    let source_indices: Vec<usize> = path_sets
        .iter()
        .enumerate()
        .filter(|(_, s)| s.kind() == PathSetKind::Source)
        .map(|(i, _)| i)
        .collect();
    let source_index = match source_indices.as_slice() {
        [single] => *single,
        [] => return Err(config_error("config must declare one path-set with kind = \"source\"")),
        _ => {
            return Err(config_error(
                "config declares more than one source path-set; exactly one is supported",
            ));
        }
    };

    let entry = join_clean(&out, &raw.bundle.entry)?;
    let outfile = join_clean(&dist, &raw.bundle.outfile)?;
    validate_bundle_not_shadowed(&path_sets, &outfile)?;

    let compile = CompileSettings {
        program: raw.compile.program,
        args: raw
            .compile
            .args
            .iter()
            .map(|arg| {
                arg.replace("{tsconfig}", &tsconfig.to_string_lossy())
                    .replace("{out}", &out.to_string_lossy())
            })
            .collect(),
    };

    let bundle = BundleSettings {
        program: raw.bundle.program,
        args: raw.bundle.args,
        entry,
        outfile,
        target: raw.bundle.target,
        sourcemap: raw.bundle.sourcemap,
        global_name: raw
            .bundle
            .global_name
            .unwrap_or_else(|| package.name.clone()),
    };

    let serve = ServeSettings {
        host: raw.serve.host,
        port: raw.serve.port,
        index: raw.serve.index,
    };

    Ok(ProjectConfig::new_unchecked(
        root,
        tsconfig,
        dist,
        out,
        mode,
        package,
        path_sets,
        source_index,
        compile,
        bundle,
        serve,
    ))
}

/// Join a relative path onto `base`, refusing `..` components so that
/// derived paths can be compared lexically.
fn join_clean(base: &Path, rel: &str) -> Result<PathBuf> {
    let rel = Path::new(rel);
    if rel.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(config_error(format!("path {rel:?} must not contain `..`")));
    }
    Ok(rel
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .fold(base.to_path_buf(), |acc, c| acc.join(c)))
}

fn validate_output_dirs(root: &Path, dist: &Path, out: &Path) -> Result<()> {
    if root.starts_with(dist) {
        return Err(config_error(format!(
            "dist directory {dist:?} must be inside the project root"
        )));
    }
    if root.starts_with(out) {
        return Err(config_error(format!(
            "out directory {out:?} must be inside the project root"
        )));
    }
    if paths_overlap(dist, out) {
        return Err(config_error(format!(
            "dist {dist:?} and out {out:?} must not overlap"
        )));
    }
    Ok(())
}

/// No static set may map a file onto the bundle or its source map: the two
/// watches write `dist` concurrently and rely on touching disjoint files.
fn validate_bundle_not_shadowed(path_sets: &[PathSet], outfile: &Path) -> Result<()> {
    let mut map_name = outfile.as_os_str().to_owned();
    map_name.push(".map");
    let artifacts = [outfile.to_path_buf(), PathBuf::from(map_name)];

    for set in path_sets {
        let Some(dest) = set.dest() else {
            continue;
        };
        for artifact in &artifacts {
            let Ok(rel) = artifact.strip_prefix(dest) else {
                continue;
            };
            for pattern in set.matcher().patterns() {
                let candidate = glob_base(pattern).join(rel);
                let candidate = candidate.to_string_lossy().replace('\\', "/");
                if set.matcher().matches(&candidate) {
                    return Err(config_error(format!(
                        "static path-set '{}' would overwrite the bundle artifact {:?} (via '{}')",
                        set.name(),
                        artifact,
                        candidate
                    )));
                }
            }
        }
    }
    Ok(())
}

fn read_package_info(fs: &dyn FileSystem, path: &Path) -> Result<PackageInfo> {
    let contents = fs.read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => config_error(format!("package.json not found at {path:?}")),
        _ => DevpipeError::io(path, e),
    })?;

    let pkg: PackageJson = serde_json::from_str(&contents)
        .map_err(|e| config_error(format!("malformed package.json at {path:?}: {e}")))?;

    match (pkg.name, pkg.version) {
        (Some(name), Some(version)) if !name.trim().is_empty() => Ok(PackageInfo { name, version }),
        _ => Err(config_error(format!(
            "package.json at {path:?} must define `name` and `version`"
        ))),
    }
}
