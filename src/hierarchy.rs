use crate::anim_error::AnimError;
use ahash::{HashMap, HashMapExt};
use log::{debug, info};

/// One joint of a skeleton. `parent` is `None` for a root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub index: usize,
    pub parent: Option<usize>,
    pub name: String,
}

/// Static tree topology of a skeleton
///
/// Nodes are stored so that every parent precedes its children, which lets
/// forward kinematics run as a single increasing pass. The hierarchy is
/// immutable once built and is shared read-only (through `Arc`) by every pose
/// and state created against it. Poses compare hierarchies by identity, so
/// two structurally equal hierarchies built separately are not
/// interchangeable.
#[derive(Clone, Debug)]
pub struct Hierarchy {
    nodes: Vec<Node>,
    lookup: HashMap<String, usize>,
}

impl Hierarchy {
    /// Builds a hierarchy from `(name, parent)` pairs given in index order
    ///
    /// # Errors
    /// Returns `AnimError::Range` if a parent does not precede its child,
    /// `AnimError::DuplicateName` if two nodes share a name and
    /// `AnimError::Allocation` if the list is empty
    pub fn new<S: AsRef<str>>(
        nodes: &[(S, Option<usize>)],
    ) -> Result<Self, AnimError> {
        if nodes.is_empty() {
            return Err(AnimError::Allocation);
        }
        let mut built = Vec::with_capacity(nodes.len());
        let mut lookup = HashMap::with_capacity(nodes.len());
        for (index, (name, parent)) in nodes.iter().enumerate() {
            let name = name.as_ref();
            if let Some(p) = *parent {
                if p >= index {
                    return Err(AnimError::range("parent", p, index));
                }
            }
            if lookup.insert(name.to_string(), index).is_some() {
                return Err(AnimError::DuplicateName(name.to_string()));
            }
            built.push(Node {
                index,
                parent: *parent,
                name: name.to_string(),
            });
        }
        info!("Hierarchy created with {} nodes", built.len());
        Ok(Self {
            nodes: built,
            lookup,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    #[must_use]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).and_then(|n| n.parent)
    }

    /// Finds a node index by exact, case sensitive name
    ///
    /// # Errors
    /// Returns `AnimError::NotFound` if no node has that name
    pub fn find(&self, name: &str) -> Result<usize, AnimError> {
        self.lookup.get(name).copied().ok_or_else(|| {
            debug!("node \"{}\" not in hierarchy", name);
            AnimError::NotFound(name.to_string())
        })
    }

    /// Iterates over the direct children of a node
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        // Children always follow their parent so the scan can start there
        self.nodes
            .iter()
            .skip(index + 1)
            .filter(move |n| n.parent == Some(index))
            .map(|n| n.index)
    }

    /// Returns true if `ancestor` is on the parent chain of `index` (or is
    /// `index` itself)
    #[must_use]
    pub fn is_ancestor(&self, ancestor: usize, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.parent(i);
        }
        false
    }

    /// Returns the chain of node indices from `first` down to `last`
    /// inclusive, ordered root to leaf
    ///
    /// # Errors
    /// Returns `AnimError::NotFound` if `first` is not an ancestor of `last`
    pub fn chain(&self, first: usize, last: usize) -> Result<Vec<usize>, AnimError> {
        let mut chain = Vec::new();
        let mut current = Some(last);
        while let Some(i) = current {
            chain.push(i);
            if i == first {
                chain.reverse();
                return Ok(chain);
            }
            current = self.parent(i);
        }
        Err(AnimError::NotFound(format!(
            "chain from node {first} to node {last}"
        )))
    }
}
