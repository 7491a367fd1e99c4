//! Tab identities and tab sets for the token-document engine.
//!
//! These tabs are the *input-side* anchors referenced by the document IR.
//! They are distinct from [`tabfmt_strdoc::Tab`]: lowering maintains a map
//! from these to freshly allocated string-document tabs.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;
use tabfmt_strdoc::TabStyle;

static NEXT_TAB_ID: AtomicU32 = AtomicU32::new(1);

/// The payload of an allocated tab. Opaque; read through [`Tab`]'s
/// accessors.
#[derive(Debug)]
pub struct TabNode {
    id: u32,
    style: TabStyle,
    parent: Tab,
}

/// A dynamic indentation anchor in the input document.
///
/// Either the root sentinel or an allocated node with a parent and a
/// style. Compared, hashed, and ordered by id; the root is ordered below
/// every allocated tab.
#[derive(Clone, Debug)]
pub enum Tab {
    /// The outermost anchor.
    Root,
    /// An allocated tab.
    Node(Arc<TabNode>),
}

impl Tab {
    /// The root tab.
    pub const ROOT: Self = Self::Root;

    /// Allocate a fresh tab under `parent` with the given style.
    ///
    /// Ids are process-wide, unique, and monotonically increasing.
    #[must_use]
    pub fn new(parent: &Tab, style: TabStyle) -> Self {
        let id = NEXT_TAB_ID.fetch_add(1, Ordering::Relaxed);
        Self::Node(Arc::new(TabNode {
            id,
            style,
            parent: parent.clone(),
        }))
    }

    /// The tab's id; the root is 0.
    #[must_use]
    pub fn id(&self) -> u32 {
        match self {
            Self::Root => 0,
            Self::Node(node) => node.id,
        }
    }

    /// Whether this is the root tab.
    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    /// The tab's style. The root is rigidly in place at the margin.
    #[must_use]
    pub fn style(&self) -> TabStyle {
        match self {
            Self::Root => TabStyle::RigidInplace,
            Self::Node(node) => node.style,
        }
    }

    /// The parent tab; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<&Tab> {
        match self {
            Self::Root => None,
            Self::Node(node) => Some(&node.parent),
        }
    }
}

impl PartialEq for Tab {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Tab {}

impl PartialOrd for Tab {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tab {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id().cmp(&other.id())
    }
}

impl std::hash::Hash for Tab {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Node(node) => write!(f, "t{}", node.id),
        }
    }
}

/// An ordered set of tabs, kept sorted by id and deduplicated.
///
/// Flow sets and broken sets are almost always one or two tabs, so the
/// storage is a small vector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TabSet {
    tabs: SmallVec<[Tab; 2]>,
}

impl TabSet {
    /// The empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A one-element set.
    #[must_use]
    pub fn singleton(tab: Tab) -> Self {
        let mut set = Self::new();
        set.insert(tab);
        set
    }

    /// Number of tabs in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Whether `tab` is in the set.
    #[must_use]
    pub fn contains(&self, tab: &Tab) -> bool {
        self.tabs.binary_search(tab).is_ok()
    }

    /// Insert a tab; returns true if it was not already present.
    pub fn insert(&mut self, tab: Tab) -> bool {
        match self.tabs.binary_search(&tab) {
            Ok(_) => false,
            Err(idx) => {
                self.tabs.insert(idx, tab);
                true
            }
        }
    }

    /// Union `other` into this set.
    pub fn union_with(&mut self, other: &TabSet) {
        for tab in &other.tabs {
            self.insert(tab.clone());
        }
    }

    /// The intersection of two sets.
    #[must_use]
    pub fn intersection(&self, other: &TabSet) -> TabSet {
        TabSet {
            tabs: self
                .tabs
                .iter()
                .filter(|t| other.contains(t))
                .cloned()
                .collect(),
        }
    }

    /// The tab with the lowest id, if any. The root precedes all others.
    #[must_use]
    pub fn first(&self) -> Option<&Tab> {
        self.tabs.first()
    }

    /// Iterate over the tabs in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Tab> {
        self.tabs.iter()
    }
}

impl fmt::Display for TabSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, tab) in self.tabs.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{tab}")?;
        }
        write!(f, "}}")
    }
}

/// A flow value: `None` when position attribution is not yet determined.
///
/// `None` is the identity for [`union_flow`].
pub type Flow = Option<TabSet>;

/// Union of two flow values, with `None` as identity.
#[must_use]
pub fn union_flow(a: Flow, b: Flow) -> Flow {
    match (a, b) {
        (None, f) | (f, None) => f,
        (Some(mut a), Some(b)) => {
            a.union_with(&b);
            Some(a)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_identity() {
        let a = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let b = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        assert_ne!(a, b);
        assert!(a < b);
        assert!(Tab::ROOT < a);
    }

    #[test]
    fn test_set_keeps_id_order() {
        let a = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let b = Tab::new(&a, TabStyle::Inplace);
        let mut set = TabSet::new();
        set.insert(b.clone());
        set.insert(a.clone());
        set.insert(b.clone());
        assert_eq!(set.len(), 2);
        assert_eq!(set.first(), Some(&a));
        assert!(set.contains(&b));
    }

    #[test]
    fn test_root_is_always_first() {
        let a = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let mut set = TabSet::singleton(a);
        set.insert(Tab::ROOT);
        assert_eq!(set.first(), Some(&Tab::ROOT));
    }

    #[test]
    fn test_intersection() {
        let a = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let b = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let c = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let mut s1 = TabSet::singleton(a.clone());
        s1.insert(b.clone());
        let mut s2 = TabSet::singleton(b.clone());
        s2.insert(c);
        assert_eq!(s1.intersection(&s2), TabSet::singleton(b));
    }

    #[test]
    fn test_union_flow_identity() {
        let a = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let set = TabSet::singleton(a);
        assert_eq!(union_flow(None, Some(set.clone())), Some(set.clone()));
        assert_eq!(union_flow(Some(set.clone()), None), Some(set));
        assert_eq!(union_flow(None, None), None);
    }
}
