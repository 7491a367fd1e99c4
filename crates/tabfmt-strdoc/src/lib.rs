//! Tabbed string documents.
//!
//! This crate defines the lower-level document algebra the formatter core
//! lowers into: plain text fragments arranged around dynamic indentation
//! anchors ("tabs"). A [`StrDoc`] records *where* content may break and at
//! which anchor; choosing which tabs actually become active, and rendering
//! the result to text, is the job of a downstream layout engine and is not
//! part of this crate.
//!
//! Tabs are identities: two tabs are the same tab only if they were
//! allocated by the same [`new_tab`] call (or both are [`Tab::ROOT`]).

#![warn(missing_docs)]

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// How content placed at a tab is positioned once the tab breaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TabStyle {
    /// Break to the column where the tab was first placed.
    Inplace,
    /// Break to the parent's column plus an indentation step.
    Indented {
        /// Minimum indentation relative to the parent, if constrained.
        min_indent: Option<u32>,
    },
    /// Like [`TabStyle::Inplace`], but the tab always activates.
    RigidInplace,
    /// Like [`TabStyle::Indented`], but the tab always activates.
    RigidIndented {
        /// Minimum indentation relative to the parent, if constrained.
        min_indent: Option<u32>,
    },
}

static NEXT_TAB_ID: AtomicU32 = AtomicU32::new(1);

/// The payload of an allocated tab. Opaque; read through [`Tab`]'s
/// accessors.
#[derive(Debug)]
pub struct TabNode {
    id: u32,
    style: TabStyle,
    parent: Tab,
}

/// A dynamic indentation anchor.
///
/// Either the root sentinel or an allocated node with a parent and a
/// style. Compared, hashed, and ordered by id; the root is ordered below
/// every allocated tab.
#[derive(Clone, Debug)]
pub enum Tab {
    /// The outermost anchor; always present, never allocated.
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

/// A lowered document: text fragments arranged around tabs.
#[derive(Clone, Debug, PartialEq)]
pub enum StrDoc {
    /// No content.
    Empty,
    /// A mandatory line break.
    Newline,
    /// A single space.
    Space,
    /// A literal text fragment; must not contain newlines.
    Text(String),
    /// Sequential composition.
    Concat(Box<StrDoc>, Box<StrDoc>),
    /// Place the inner document at the given tab.
    At(Tab, Box<StrDoc>),
    /// Introduce a freshly allocated tab scoped to `body`.
    NewTab {
        /// The introduced tab.
        tab: Tab,
        /// The document the tab is in scope for.
        body: Box<StrDoc>,
    },
    /// Branch on whether the tab becomes active.
    Cond {
        /// The governing tab.
        tab: Tab,
        /// Chosen when the tab stays inactive.
        inactive: Box<StrDoc>,
        /// Chosen when the tab activates.
        active: Box<StrDoc>,
    },
}

/// The empty document.
#[must_use]
pub fn empty() -> StrDoc {
    StrDoc::Empty
}

/// A mandatory line break.
#[must_use]
pub fn newline() -> StrDoc {
    StrDoc::Newline
}

/// A single space.
#[must_use]
pub fn space() -> StrDoc {
    StrDoc::Space
}

/// A literal text fragment.
#[must_use]
pub fn text(s: impl Into<String>) -> StrDoc {
    StrDoc::Text(s.into())
}

/// Sequential composition; the empty document is absorbed on either side.
#[must_use]
pub fn concat(a: StrDoc, b: StrDoc) -> StrDoc {
    match (a, b) {
        (StrDoc::Empty, d) | (d, StrDoc::Empty) => d,
        (a, b) => StrDoc::Concat(Box::new(a), Box::new(b)),
    }
}

/// Place `doc` at `tab`.
#[must_use]
pub fn at(tab: Tab, doc: StrDoc) -> StrDoc {
    StrDoc::At(tab, Box::new(doc))
}

/// Branch on whether `tab` becomes active.
#[must_use]
pub fn cond(tab: Tab, inactive: StrDoc, active: StrDoc) -> StrDoc {
    StrDoc::Cond {
        tab,
        inactive: Box::new(inactive),
        active: Box::new(active),
    }
}

/// Allocate a fresh tab under `parent` and build its scope with `f`.
#[must_use]
pub fn new_tab(parent: &Tab, style: TabStyle, f: impl FnOnce(Tab) -> StrDoc) -> StrDoc {
    let tab = Tab::new(parent, style);
    let body = f(tab.clone());
    StrDoc::NewTab {
        tab,
        body: Box::new(body),
    }
}

impl fmt::Display for StrDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Newline => write!(f, "nl"),
            Self::Space => write!(f, "sp"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Concat(_, _) => {
                write!(f, "[")?;
                write_flat(f, self)?;
                write!(f, "]")
            }
            Self::At(tab, d) => write!(f, "(at {tab} {d})"),
            Self::NewTab { tab, body } => {
                write!(f, "(newtab {tab} {} {body})", style_name(tab.style()))
            }
            Self::Cond {
                tab,
                inactive,
                active,
            } => write!(f, "(cond {tab} {inactive} {active})"),
        }
    }
}

/// Write a concat chain flattened, space-separated.
fn write_flat(f: &mut fmt::Formatter<'_>, doc: &StrDoc) -> fmt::Result {
    match doc {
        StrDoc::Concat(a, b) => {
            write_flat(f, a)?;
            write!(f, " ")?;
            write_flat(f, b)
        }
        other => write!(f, "{other}"),
    }
}

fn style_name(style: TabStyle) -> &'static str {
    match style {
        TabStyle::Inplace => "inplace",
        TabStyle::Indented { .. } => "indented",
        TabStyle::RigidInplace => "rigid-inplace",
        TabStyle::RigidIndented { .. } => "rigid-indented",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_ids_unique_and_increasing() {
        let a = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let b = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        assert!(a.id() < b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_root_orders_below_all() {
        let a = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        assert!(Tab::ROOT < a);
        assert!(Tab::ROOT.is_root());
        assert_eq!(Tab::ROOT, Tab::ROOT);
    }

    #[test]
    fn test_tab_parent_chain() {
        let a = Tab::new(&Tab::ROOT, TabStyle::Indented { min_indent: None });
        let b = Tab::new(&a, TabStyle::Inplace);
        assert_eq!(b.parent(), Some(&a));
        assert_eq!(a.parent(), Some(&Tab::ROOT));
        assert_eq!(Tab::ROOT.parent(), None);
    }

    #[test]
    fn test_concat_absorbs_empty() {
        assert_eq!(concat(empty(), text("x")), text("x"));
        assert_eq!(concat(text("x"), empty()), text("x"));
        assert_eq!(concat(empty(), empty()), empty());
    }

    #[test]
    fn test_display_structure() {
        let doc = concat(text("val"), concat(space(), text("x")));
        assert_eq!(doc.to_string(), r#"["val" sp "x"]"#);

        let tab = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let doc = cond(tab.clone(), empty(), newline());
        assert_eq!(doc.to_string(), format!("(cond t{} empty nl)", tab.id()));
    }

    #[test]
    fn test_new_tab_scopes_fresh_tab() {
        let doc = new_tab(&Tab::ROOT, TabStyle::Inplace, |t| at(t, text("x")));
        match doc {
            StrDoc::NewTab { tab, body } => match *body {
                StrDoc::At(at_tab, _) => assert_eq!(tab, at_tab),
                other => panic!("expected At, got {other:?}"),
            },
            other => panic!("expected NewTab, got {other:?}"),
        }
    }
}
