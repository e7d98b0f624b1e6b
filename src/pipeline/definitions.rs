// src/pipeline/definitions.rs

//! Named pipelines and their validation.

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::ProjectConfig;
use crate::errors::{DevpipeError, Result};
use crate::pipeline::step::{Primitive, Step};
use crate::types::{Name, PathSetKind};

pub const COMPILE: &str = "compile";
pub const BUILD: &str = "build";
pub const DEV: &str = "dev";
pub const REBUILD: &str = "rebuild";

const REFRESH_PREFIX: &str = "refresh:";

/// Name of the pipeline triggered by the static watch over `set`.
pub fn refresh_name(set: &str) -> Name {
    format!("{REFRESH_PREFIX}{set}")
}

/// Immutable mapping from pipeline name to its step tree.
#[derive(Debug, Clone, Default)]
pub struct PipelineSet {
    pipelines: BTreeMap<Name, Step>,
}

impl PipelineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the pipelines every project gets:
    ///
    /// - `compile = sequence(clean(out), compile)`
    /// - `build   = sequence(clean(dist), parallel(copy(static)...), compile, bundle)`
    /// - `dev     = sequence(build, arm-watches, start-server)`
    /// - `rebuild = sequence(compile, bundle, reload)`
    /// - `refresh:<set> = sequence(copy(set), reload)` for each static set
    pub fn standard(config: &ProjectConfig) -> Self {
        let mut set = Self::new();

        set.insert(
            COMPILE,
            Step::sequence([
                Step::run(Primitive::Clean(config.out().to_path_buf())),
                Step::run(Primitive::Compile),
            ]),
        );

        let copies = config
            .static_sets()
            .map(|s| Step::run(Primitive::CopyStatic(s.name().to_string())));

        set.insert(
            BUILD,
            Step::sequence([
                Step::run(Primitive::Clean(config.dist().to_path_buf())),
                Step::parallel(copies),
                Step::pipeline(COMPILE),
                Step::run(Primitive::Bundle),
            ]),
        );

        set.insert(
            DEV,
            Step::sequence([
                Step::pipeline(BUILD),
                Step::run(Primitive::ArmWatches),
                Step::run(Primitive::StartServer),
            ]),
        );

        set.insert(
            REBUILD,
            Step::sequence([
                Step::pipeline(COMPILE),
                Step::run(Primitive::Bundle),
                Step::run(Primitive::Reload),
            ]),
        );

        for s in config.static_sets() {
            set.insert(
                refresh_name(s.name()),
                Step::sequence([
                    Step::run(Primitive::CopyStatic(s.name().to_string())),
                    Step::run(Primitive::Reload),
                ]),
            );
        }

        set
    }

    pub fn insert(&mut self, name: impl Into<Name>, step: Step) {
        self.pipelines.insert(name.into(), step);
    }

    pub fn get(&self, name: &str) -> Option<&Step> {
        self.pipelines.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Step)> {
        self.pipelines.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Checks that:
    /// - every `Pipeline(name)` reference exists,
    /// - every `CopyStatic(set)` names a static path-set of `config`,
    /// - references between pipelines form no cycle.
    pub fn validate(&self, config: &ProjectConfig) -> Result<()> {
        for (name, step) in self.iter() {
            for reference in step.references() {
                if !self.contains(reference) {
                    return Err(DevpipeError::ConfigError(format!(
                        "pipeline '{name}' references unknown pipeline '{reference}'"
                    )));
                }
            }

            for primitive in step.primitives() {
                if let Primitive::CopyStatic(set) = primitive {
                    match config.path_set(set) {
                        Some(ps) if ps.kind() == PathSetKind::Static => {}
                        Some(_) => {
                            return Err(DevpipeError::ConfigError(format!(
                                "pipeline '{name}' copies path-set '{set}', which is not static"
                            )));
                        }
                        None => {
                            return Err(DevpipeError::ConfigError(format!(
                                "pipeline '{name}' copies unknown path-set '{set}'"
                            )));
                        }
                    }
                }
            }
        }

        self.validate_acyclic()
    }

    fn validate_acyclic(&self) -> Result<()> {
        // Edge direction: referenced -> referencing.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for (name, _) in self.iter() {
            graph.add_node(name);
        }

        for (name, step) in self.iter() {
            for reference in step.references() {
                if reference == name {
                    return Err(DevpipeError::PipelineCycle(format!(
                        "pipeline '{name}' references itself"
                    )));
                }
                graph.add_edge(reference, name, ());
            }
        }

        match toposort(&graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(DevpipeError::PipelineCycle(format!(
                "cycle detected between pipelines involving '{}'",
                cycle.node_id()
            ))),
        }
    }
}
