use super::comparer::PathComparer;
use rustc_hash::FxHasher;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Comparer used for every name equality, hash and ordering in the crate.
pub const NAME_COMPARER: PathComparer = PathComparer::platform();

struct NameNode {
    parent: Option<DirectoryName>,
    /// Simple name, or the absolute path for a root.
    name: Box<str>,
    hash: u64,
}

impl NameNode {
    fn new(parent: Option<DirectoryName>, name: &str) -> Arc<Self> {
        let mut hasher = FxHasher::default();
        if let Some(p) = &parent {
            hasher.write_u64(p.0.hash);
        }
        NAME_COMPARER.hash(name, &mut hasher);
        Arc::new(Self {
            parent,
            name: name.into(),
            hash: hasher.finish(),
        })
    }

    fn same(a: &Arc<NameNode>, b: &Arc<NameNode>) -> bool {
        if Arc::ptr_eq(a, b) {
            return true;
        }
        if a.hash != b.hash || !NAME_COMPARER.equals(&a.name, &b.name) {
            return false;
        }
        match (&a.parent, &b.parent) {
            (Some(pa), Some(pb)) => pa == pb,
            (None, None) => true,
            _ => false,
        }
    }

    /// Names from the root down to this node (root first).
    fn chain(node: &Arc<NameNode>) -> Vec<&str> {
        let mut parts = Vec::new();
        let mut current: Option<&Arc<NameNode>> = Some(node);
        while let Some(n) = current {
            parts.push(n.name.as_ref());
            current = n.parent.as_ref().map(|p| &p.0);
        }
        parts.reverse();
        parts
    }

    fn compare(a: &Arc<NameNode>, b: &Arc<NameNode>) -> Ordering {
        if Arc::ptr_eq(a, b) {
            return Ordering::Equal;
        }
        let left = Self::chain(a);
        let right = Self::chain(b);
        for (l, r) in left.iter().zip(right.iter()) {
            match NAME_COMPARER.compare(l, r) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        left.len().cmp(&right.len())
    }

    fn relative_path(node: &Arc<NameNode>) -> PathBuf {
        let chain = Self::chain(node);
        chain.iter().skip(1).collect()
    }

    fn full_path(node: &Arc<NameNode>) -> PathBuf {
        Self::chain(node).iter().collect()
    }
}

/// A directory in a project tree. Roots carry the absolute project path;
/// every other directory is a simple name under its parent.
///
/// Handles are cheap to clone. A child keeps its parent alive, a parent
/// never references its children.
#[derive(Clone)]
pub struct DirectoryName(Arc<NameNode>);

/// A file under a [`DirectoryName`].
#[derive(Clone)]
pub struct FileName(Arc<NameNode>);

impl DirectoryName {
    pub fn new_root(path: impl AsRef<Path>) -> Self {
        Self(NameNode::new(None, &path.as_ref().to_string_lossy()))
    }

    pub fn child_directory(&self, name: &str) -> DirectoryName {
        DirectoryName(NameNode::new(Some(self.clone()), name))
    }

    pub fn child_file(&self, name: &str) -> FileName {
        FileName(NameNode::new(Some(self.clone()), name))
    }

    /// Build the directory at `relative` below this one, one component at a
    /// time. Returns `None` for paths that escape the directory or carry a
    /// name that is not UTF-8.
    pub fn descendant(&self, relative: &Path) -> Option<DirectoryName> {
        let mut current = self.clone();
        for component in relative.components() {
            match component {
                Component::Normal(name) => {
                    current = current.child_directory(name.to_str()?);
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&DirectoryName> {
        self.0.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    pub fn root(&self) -> DirectoryName {
        let mut current = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current.clone()
    }

    pub fn relative_path(&self) -> PathBuf {
        NameNode::relative_path(&self.0)
    }

    pub fn full_path(&self) -> PathBuf {
        NameNode::full_path(&self.0)
    }

    /// True if `self` is `other` or one of its ancestors.
    pub fn contains(&self, other: &DirectoryName) -> bool {
        let mut current = Some(other);
        while let Some(dir) = current {
            if dir == self {
                return true;
            }
            current = dir.parent();
        }
        false
    }
}

impl FileName {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> &DirectoryName {
        // Files are only ever created through `DirectoryName::child_file`.
        self.0
            .parent
            .as_ref()
            .expect("file names always have a parent directory")
    }

    pub fn root(&self) -> DirectoryName {
        self.parent().root()
    }

    pub fn relative_path(&self) -> PathBuf {
        NameNode::relative_path(&self.0)
    }

    pub fn full_path(&self) -> PathBuf {
        NameNode::full_path(&self.0)
    }

    /// Lower-cased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.name();
        let dot = name.rfind('.')?;
        if dot == 0 || dot + 1 == name.len() {
            return None;
        }
        Some(name[dot + 1..].to_ascii_lowercase())
    }
}

macro_rules! impl_name_traits {
    ($ty:ident) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                NameNode::same(&self.0, &other.0)
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                state.write_u64(self.0.hash);
            }
        }

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                NameNode::compare(&self.0, &other.0)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self.full_path().display())
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.full_path().display())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    };
}

impl_name_traits!(DirectoryName);
impl_name_traits!(FileName);
