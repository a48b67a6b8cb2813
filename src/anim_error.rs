use std::{error, fmt};

/// Geometric degeneracies that IK solvers recover from locally. These are
/// reported through `AnimError::DegenerateGeometry` by helpers such as
/// `util::try_normalize` and are never propagated out of a solve.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Degeneracy {
    ZeroLengthVector,
    ZeroLengthBone,
    TargetAtBase,
    ColinearConstraint,
}

impl fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ZeroLengthVector => write!(f, "zero length vector"),
            Self::ZeroLengthBone => write!(f, "zero length bone"),
            Self::TargetAtBase => write!(f, "target coincides with base"),
            Self::ColinearConstraint => {
                write!(f, "constraint is colinear with base to end")
            }
        }
    }
}

/// Unified error type
///
/// Construction errors (`Allocation`, `Range` during init) leave nothing
/// half built: the constructor returns the error instead of the object.
/// Per-tick errors (`IncompleteNode`, `HierarchyMismatch`,
/// `SingularTransform`) abort the tick for one animated instance only.
///
/// `serde_yaml::Error` is large so it is boxed.
#[derive(Debug)]
pub enum AnimError {
    Allocation,
    Range {
        what: &'static str,
        index: usize,
        bound: usize,
    },
    HierarchyMismatch,
    RepresentationMismatch,
    IncompleteNode(usize),
    NotFound(String),
    DuplicateName(String),
    DegenerateGeometry(Degeneracy),
    SingularTransform(usize),
    SerdeYamlError(Box<serde_yaml::Error>),
    StdIoError(std::io::Error),
}

impl error::Error for AnimError {}

impl fmt::Display for AnimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Allocation => write!(f, "pool allocation failed"),
            Self::Range { what, index, bound } => {
                write!(f, "{what} {index} out of range (bound {bound})")
            }
            Self::HierarchyMismatch => {
                write!(f, "operands belong to different hierarchies")
            }
            Self::RepresentationMismatch => {
                write!(f, "operands use different rotation representations")
            }
            Self::IncompleteNode(n) => {
                write!(f, "blend node {n} is missing required inputs")
            }
            Self::NotFound(name) => write!(f, "\"{name}\" not found"),
            Self::DuplicateName(name) => {
                write!(f, "name \"{name}\" is already in use")
            }
            Self::DegenerateGeometry(kind) => {
                write!(f, "degenerate geometry: {kind}")
            }
            Self::SingularTransform(n) => {
                write!(f, "transform of node {n} is not invertible")
            }
            Self::SerdeYamlError(e) => {
                write!(f, "serde_yaml::Error: {e}")
            }
            Self::StdIoError(e) => write!(f, "std::io::Error: {}", e.kind()),
        }
    }
}

impl AnimError {
    /// Shorthand for building a `Range` error
    #[must_use]
    pub const fn range(what: &'static str, index: usize, bound: usize) -> Self {
        Self::Range { what, index, bound }
    }
}

impl From<serde_yaml::Error> for AnimError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::SerdeYamlError(Box::new(e))
    }
}

impl From<std::io::Error> for AnimError {
    fn from(e: std::io::Error) -> Self {
        Self::StdIoError(e)
    }
}

impl From<Degeneracy> for AnimError {
    fn from(d: Degeneracy) -> Self {
        Self::DegenerateGeometry(d)
    }
}
