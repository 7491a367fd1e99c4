//! First-occurrence marking.
//!
//! Lifts the input [`Doc`] to the annotated IR, marking each `At` with
//! whether it might be the first break onto its tab. The walk threads a
//! *broken set*: the tabs certainly broken onto so far along the current
//! spine. Conditionals keep only the intersection of what their branches
//! break; shared sub-documents record the breaks they perform so every
//! use site can account for them.
//!
//! This pass cannot fail.

use rustc_hash::FxHashMap;

use crate::ann::AnnDoc;
use crate::doc::{Doc, DocVar};
use crate::tab::TabSet;

/// Annotate `doc`, marking first occurrences of each tab.
#[must_use]
pub fn annotate(doc: &Doc) -> AnnDoc {
    let mut annotator = Annotator::default();
    let (ann, _) = annotator.go(doc, TabSet::new());
    ann
}

#[derive(Default)]
struct Annotator {
    /// Tabs each bound sub-document breaks onto, analyzed from an empty
    /// broken set at its binder.
    broken_of: FxHashMap<DocVar, TabSet>,
}

impl Annotator {
    fn go(&mut self, doc: &Doc, mut broken: TabSet) -> (AnnDoc, TabSet) {
        match doc {
            Doc::Empty => (AnnDoc::Empty, broken),
            Doc::Space => (AnnDoc::Space, broken),
            Doc::NoSpace => (AnnDoc::NoSpace, broken),
            Doc::Token(tok) => (
                AnnDoc::Token {
                    flow: None,
                    tok: *tok,
                },
                broken,
            ),
            Doc::Text(text) => (
                AnnDoc::Text {
                    flow: None,
                    text: text.clone(),
                },
                broken,
            ),
            Doc::Concat(a, b) => {
                let (a, broken) = self.go(a, broken);
                let (b, broken) = self.go(b, broken);
                (AnnDoc::Concat(Box::new(a), Box::new(b)), broken)
            }
            Doc::At(tab, inner) => {
                let might_be_first = broken.insert(tab.clone());
                let (inner, broken) = self.go(inner, broken);
                (
                    AnnDoc::At {
                        might_be_first,
                        tab: tab.clone(),
                        doc: Box::new(inner),
                    },
                    broken,
                )
            }
            Doc::NewTab { tab, body } => {
                let (body, broken) = self.go(body, broken);
                (
                    AnnDoc::NewTab {
                        tab: tab.clone(),
                        body: Box::new(body),
                    },
                    broken,
                )
            }
            Doc::Cond {
                tab,
                inactive,
                active,
            } => {
                let (inactive, broken_inactive) = self.go(inactive, broken.clone());
                let (active, broken_active) = self.go(active, broken);
                // A tab is certainly broken only if both branches broke it.
                let broken = broken_inactive.intersection(&broken_active);
                (
                    AnnDoc::Cond {
                        tab: tab.clone(),
                        inactive: Box::new(inactive),
                        active: Box::new(active),
                    },
                    broken,
                )
            }
            Doc::Let { var, bound, body } => {
                let (bound, bound_broken) = self.go(bound, TabSet::new());
                self.broken_of.insert(*var, bound_broken);
                let (body, broken) = self.go(body, broken);
                (
                    AnnDoc::Let {
                        var: *var,
                        bound: Box::new(bound),
                        body: Box::new(body),
                    },
                    broken,
                )
            }
            Doc::Var(v) => {
                let bound_broken = self
                    .broken_of
                    .get(v)
                    .expect("doc var bound before use");
                broken.union_with(bound_broken);
                (AnnDoc::Var(*v), broken)
            }
        }
    }
}
