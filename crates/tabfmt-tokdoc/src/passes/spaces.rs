//! Space insertion.
//!
//! Guarantees that no two adjacent visible pieces are emitted without
//! separation. The pass classifies the left and right *edge* of every
//! sub-document — does it emit whitespace there, might it emit
//! non-whitespace, or does it emit nothing — and threads need-space flags
//! through the rewrite, materializing an explicit space wherever a
//! maybe-not-spacey edge meets another.
//!
//! A non-first `at` supplies its own separation (a break when the tab is
//! active, a space when it is not), so a pending need is dropped at such
//! a node unless an enclosing `Cond` pinned the tab inactive.
//! Conditional branches are rewritten under their refined contexts, and
//! edges of an unresolved `Cond` combine conservatively. Shared
//! sub-documents collect the flags observed at their use sites and are
//! rewritten once under the OR of all of them.

use rustc_hash::FxHashMap;

use crate::ann::{concat, AnnDoc};
use crate::doc::DocVar;
use crate::passes::{CondCtx, CondState};
use crate::PipelineStats;

/// Edge classification of a sub-document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    /// Emits whitespace at this edge under every live branch.
    Spacey,
    /// May emit non-whitespace at this edge.
    MaybeNotSpacey,
}

/// An edge; `None` when the sub-document contributes nothing there.
pub type Edge = Option<EdgeKind>;

/// Insert explicit spaces wherever separation is needed in `doc`.
#[must_use]
pub fn ensure_spaces(doc: AnnDoc, stats: &mut PipelineStats) -> AnnDoc {
    let mut ensurer = SpaceEnsurer {
        var_edges: FxHashMap::default(),
        var_space: FxHashMap::default(),
        stats,
    };
    ensurer.rewrite(doc, (false, false), &CondCtx::new())
}

struct SpaceEnsurer<'a> {
    /// Edges of each bound sub-document, computed at its binder.
    var_edges: FxHashMap<DocVar, (Edge, Edge)>,
    /// OR-accumulated need-space flags over each variable's use sites.
    var_space: FxHashMap<DocVar, (bool, bool)>,
    stats: &'a mut PipelineStats,
}

impl SpaceEnsurer<'_> {
    /// The (left, right) edges of `doc` under `ctx`.
    fn edges(&mut self, doc: &AnnDoc, ctx: &CondCtx) -> (Edge, Edge) {
        match doc {
            AnnDoc::Space | AnnDoc::NoSpace | AnnDoc::Newline => {
                // NoSpace counts as spacey so it suppresses insertion; it
                // is elided during lowering.
                (Some(EdgeKind::Spacey), Some(EdgeKind::Spacey))
            }
            AnnDoc::Token { .. } | AnnDoc::Text { .. } => (
                Some(EdgeKind::MaybeNotSpacey),
                Some(EdgeKind::MaybeNotSpacey),
            ),
            AnnDoc::Empty => (None, None),
            AnnDoc::Concat(a, b) => {
                let (la, ra) = self.edges(a, ctx);
                let (lb, rb) = self.edges(b, ctx);
                (la.or(lb), rb.or(ra))
            }
            AnnDoc::At {
                might_be_first,
                tab,
                doc,
            } => {
                let (l_inner, r_inner) = self.edges(doc, ctx);
                let left = if ctx.is_inactive(tab) {
                    // The tab will not break here; the at is a no-op and
                    // the inner document's edge shows through.
                    l_inner
                } else if *might_be_first {
                    // The first placement emits nothing of its own.
                    None
                } else {
                    Some(EdgeKind::Spacey)
                };
                (left, r_inner.or(left))
            }
            AnnDoc::NewTab { body, .. } => self.edges(body, ctx),
            AnnDoc::Cond {
                tab,
                inactive,
                active,
            } => match ctx.get(tab) {
                Some(CondState::Active) => self.edges(active, ctx),
                Some(CondState::Inactive) => self.edges(inactive, ctx),
                None => {
                    let (li, ri) = self.edges(inactive, &ctx.with(tab, CondState::Inactive));
                    let (la, ra) = self.edges(active, &ctx.with(tab, CondState::Active));
                    (combine_edges(li, la), combine_edges(ri, ra))
                }
            },
            AnnDoc::Let { var, bound, body } => {
                let bound_edges = self.edges(bound, ctx);
                self.var_edges.insert(*var, bound_edges);
                self.edges(body, ctx)
            }
            AnnDoc::Var(v) => *self
                .var_edges
                .get(v)
                .expect("doc var bound before use"),
        }
    }

    fn rewrite(&mut self, doc: AnnDoc, need: (bool, bool), ctx: &CondCtx) -> AnnDoc {
        match doc {
            // Separators absorb any pending need.
            AnnDoc::Space | AnnDoc::NoSpace | AnnDoc::Newline => doc,
            AnnDoc::Empty => {
                if need.0 || need.1 {
                    self.stats.spaces_inserted += 1;
                    AnnDoc::Space
                } else {
                    AnnDoc::Empty
                }
            }
            AnnDoc::Token { .. } | AnnDoc::Text { .. } => {
                let mut out = doc;
                if need.0 {
                    self.stats.spaces_inserted += 1;
                    out = concat(AnnDoc::Space, out);
                }
                if need.1 {
                    self.stats.spaces_inserted += 1;
                    out = concat(out, AnnDoc::Space);
                }
                out
            }
            AnnDoc::Concat(a, b) => {
                // Does `a` end in something that may abut `b`?
                let abutting = self.edges(&a, ctx).1 == Some(EdgeKind::MaybeNotSpacey);
                let a = self.rewrite(*a, (need.0, false), ctx);
                let b = self.rewrite(*b, (abutting, need.1), ctx);
                AnnDoc::Concat(Box::new(a), Box::new(b))
            }
            AnnDoc::At {
                might_be_first,
                tab,
                doc,
            } => {
                let guaranteed_break = !might_be_first && !ctx.is_inactive(&tab);
                let inner = self.rewrite(*doc, (false, need.1), ctx);
                let node = AnnDoc::At {
                    might_be_first,
                    tab,
                    doc: Box::new(inner),
                };
                if need.0 && !guaranteed_break {
                    self.stats.spaces_inserted += 1;
                    concat(AnnDoc::Space, node)
                } else {
                    node
                }
            }
            AnnDoc::NewTab { tab, body } => AnnDoc::NewTab {
                tab,
                body: Box::new(self.rewrite(*body, need, ctx)),
            },
            AnnDoc::Cond {
                tab,
                inactive,
                active,
            } => {
                let inactive =
                    self.rewrite(*inactive, need, &ctx.with(&tab, CondState::Inactive));
                let active = self.rewrite(*active, need, &ctx.with(&tab, CondState::Active));
                AnnDoc::Cond {
                    tab,
                    inactive: Box::new(inactive),
                    active: Box::new(active),
                }
            }
            AnnDoc::Let { var, bound, body } => {
                let bound_edges = self.edges(&bound, ctx);
                self.var_edges.insert(var, bound_edges);
                self.var_space.entry(var).or_insert((false, false));
                let body = self.rewrite(*body, need, ctx);
                // Second phase: rewrite the shared sub-document under the
                // flags accumulated across its use sites.
                let accumulated = self.var_space[&var];
                let bound = self.rewrite(*bound, accumulated, ctx);
                AnnDoc::Let {
                    var,
                    bound: Box::new(bound),
                    body: Box::new(body),
                }
            }
            AnnDoc::Var(v) => {
                let entry = self
                    .var_space
                    .get_mut(&v)
                    .expect("doc var bound before use");
                entry.0 |= need.0;
                entry.1 |= need.1;
                AnnDoc::Var(v)
            }
        }
    }
}

/// Combine the same-side edges of an unresolved conditional's branches.
fn combine_edges(a: Edge, b: Edge) -> Edge {
    match (a, b) {
        (Some(EdgeKind::MaybeNotSpacey), _) | (_, Some(EdgeKind::MaybeNotSpacey)) => {
            Some(EdgeKind::MaybeNotSpacey)
        }
        (None, _) | (_, None) => None,
        (Some(EdgeKind::Spacey), Some(EdgeKind::Spacey)) => Some(EdgeKind::Spacey),
    }
}
