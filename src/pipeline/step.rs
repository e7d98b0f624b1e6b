// src/pipeline/step.rs

use std::fmt;
use std::path::PathBuf;

use crate::types::Name;

/// Leaf units of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    /// Empty a directory: delete it if present, then recreate it.
    Clean(PathBuf),
    /// Copy the files of a static path-set into its destination.
    CopyStatic(Name),
    /// Run the compiler over the source path-set.
    Compile,
    /// Bundle the compiled entry into the distributable artifact.
    Bundle,
    /// Arm one watch per path-set.
    ArmWatches,
    /// Start the live-reload server.
    StartServer,
    /// Push a reload signal to connected browsers.
    Reload,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Clean(path) => write!(f, "clean({})", path.display()),
            Primitive::CopyStatic(set) => write!(f, "copy({set})"),
            Primitive::Compile => f.write_str("compile"),
            Primitive::Bundle => f.write_str("bundle"),
            Primitive::ArmWatches => f.write_str("arm-watches"),
            Primitive::StartServer => f.write_str("start-server"),
            Primitive::Reload => f.write_str("reload"),
        }
    }
}

/// A composable unit of work.
///
/// - `Sequence`: one at a time, in order; the first error aborts the rest.
/// - `Parallel`: all at once; waits for every member, reports the first error.
/// - `Pipeline`: another named pipeline, resolved at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Run(Primitive),
    Sequence(Vec<Step>),
    Parallel(Vec<Step>),
    Pipeline(Name),
}

impl Step {
    pub fn run(primitive: Primitive) -> Self {
        Step::Run(primitive)
    }

    pub fn sequence(steps: impl IntoIterator<Item = Step>) -> Self {
        Step::Sequence(steps.into_iter().collect())
    }

    pub fn parallel(steps: impl IntoIterator<Item = Step>) -> Self {
        Step::Parallel(steps.into_iter().collect())
    }

    pub fn pipeline(name: impl Into<Name>) -> Self {
        Step::Pipeline(name.into())
    }

    /// Names of pipelines referenced anywhere in this step tree.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.visit(&mut |step| {
            if let Step::Pipeline(name) = step {
                out.push(name.as_str());
            }
        });
        out
    }

    /// Primitives anywhere in this step tree, in document order.
    pub fn primitives(&self) -> Vec<&Primitive> {
        let mut out = Vec::new();
        self.visit(&mut |step| {
            if let Step::Run(p) = step {
                out.push(p);
            }
        });
        out
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Step)) {
        f(self);
        if let Step::Sequence(steps) | Step::Parallel(steps) = self {
            for step in steps {
                step.visit(f);
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Run(p) => write!(f, "{p}"),
            Step::Pipeline(name) => write!(f, "{name}"),
            Step::Sequence(steps) | Step::Parallel(steps) => {
                let label = if matches!(self, Step::Sequence(_)) {
                    "sequence"
                } else {
                    "parallel"
                };
                write!(f, "{label}(")?;
                for (i, step) in steps.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{step}")?;
                }
                f.write_str(")")
            }
        }
    }
}
