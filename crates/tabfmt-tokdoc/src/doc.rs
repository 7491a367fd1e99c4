//! The input document IR and its smart constructors.
//!
//! A [`Doc`] declares how tokens should be laid out relative to tabs; it
//! says nothing about line breaks directly. Documents are built with the
//! free-function constructors below, which keep the tree normalized
//! (concatenation absorbs the empty document) and handle the allocation
//! of tab and doc-var identities.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use tabfmt_strdoc::TabStyle;
use tabfmt_token::TokenId;

use crate::tab::Tab;

static NEXT_VAR_ID: AtomicU32 = AtomicU32::new(0);

/// The identity of a named sub-document bound by [`let_doc`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct DocVar(u32);

impl DocVar {
    fn fresh() -> Self {
        Self(NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DocVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// A tabbed token document.
#[derive(Clone, Debug, PartialEq)]
pub enum Doc {
    /// No content.
    Empty,
    /// A mandatory space.
    Space,
    /// An explicit anti-space: suppresses inserted separation.
    NoSpace,
    /// A source token.
    Token(TokenId),
    /// A literal string fragment that is not a source token.
    Text(String),
    /// Sequential composition.
    Concat(Box<Doc>, Box<Doc>),
    /// Lay the inner document out at the given tab.
    At(Tab, Box<Doc>),
    /// Introduce a freshly allocated tab scoped to `body`.
    NewTab {
        /// The introduced tab.
        tab: Tab,
        /// The document the tab is in scope for.
        body: Box<Doc>,
    },
    /// Branch on whether the tab becomes active.
    Cond {
        /// The governing tab.
        tab: Tab,
        /// Chosen when the tab stays inactive.
        inactive: Box<Doc>,
        /// Chosen when the tab activates.
        active: Box<Doc>,
    },
    /// Bind a shared sub-document to a variable within `body`.
    Let {
        /// The bound variable.
        var: DocVar,
        /// The shared sub-document.
        bound: Box<Doc>,
        /// The scope of the binding.
        body: Box<Doc>,
    },
    /// An occurrence of a bound sub-document.
    Var(DocVar),
}

/// The empty document.
#[must_use]
pub fn empty() -> Doc {
    Doc::Empty
}

/// A mandatory space.
#[must_use]
pub fn space() -> Doc {
    Doc::Space
}

/// An explicit anti-space.
#[must_use]
pub fn no_space() -> Doc {
    Doc::NoSpace
}

/// A source token.
#[must_use]
pub fn token(tok: TokenId) -> Doc {
    Doc::Token(tok)
}

/// A literal string fragment.
#[must_use]
pub fn text(s: impl Into<String>) -> Doc {
    Doc::Text(s.into())
}

/// Sequential composition; the empty document is absorbed on either side.
#[must_use]
pub fn concat(a: Doc, b: Doc) -> Doc {
    match (a, b) {
        (Doc::Empty, d) | (d, Doc::Empty) => d,
        (a, b) => Doc::Concat(Box::new(a), Box::new(b)),
    }
}

/// Lay `doc` out at `tab`.
#[must_use]
pub fn at(tab: Tab, doc: Doc) -> Doc {
    Doc::At(tab, Box::new(doc))
}

/// Branch on whether `tab` becomes active.
#[must_use]
pub fn cond(tab: Tab, inactive: Doc, active: Doc) -> Doc {
    Doc::Cond {
        tab,
        inactive: Box::new(inactive),
        active: Box::new(active),
    }
}

/// Allocate a fresh tab under `parent` and build its scope with `f`.
#[must_use]
pub fn new_tab(parent: &Tab, style: TabStyle, f: impl FnOnce(Tab) -> Doc) -> Doc {
    let tab = Tab::new(parent, style);
    let body = f(tab.clone());
    Doc::NewTab {
        tab,
        body: Box::new(body),
    }
}

/// Bind `bound` to a fresh variable and build the scope with `f`.
///
/// Every occurrence the callback places with [`var`] shares the single
/// analyzed copy of `bound`.
#[must_use]
pub fn let_doc(bound: Doc, f: impl FnOnce(DocVar) -> Doc) -> Doc {
    let v = DocVar::fresh();
    let body = f(v);
    Doc::Let {
        var: v,
        bound: Box::new(bound),
        body: Box::new(body),
    }
}

/// An occurrence of a bound sub-document.
#[must_use]
pub fn var(v: DocVar) -> Doc {
    Doc::Var(v)
}
