//! Flow-set propagation.
//!
//! Attributes every token and text leaf with the set of tabs that
//! determine its horizontal position. The walk threads a flow value:
//! entering `At(tab, _)` pins the flow to that tab alone, a `Cond` adds
//! its governing tab to whatever flows through either branch, and leaves
//! pass the value along unchanged. Shared sub-documents accumulate the
//! flows of all their use sites and are re-annotated once afterwards
//! under the union (two-phase fix-up, no fixed-point iteration).
//!
//! The pass runs twice in the pipeline: once on the freshly annotated
//! document and once more after comment weaving, so woven comments pick
//! up flow sets of their own. Re-running overwrites earlier attribution.

use rustc_hash::FxHashMap;

use crate::ann::AnnDoc;
use crate::doc::DocVar;
use crate::passes::{CondCtx, CondState};
use crate::tab::{union_flow, Flow, Tab, TabSet};

/// Propagate flow sets through `doc`, starting from the root tab.
#[must_use]
pub fn analyze(doc: AnnDoc) -> AnnDoc {
    let mut analyzer = FlowAnalyzer::default();
    let initial = Some(TabSet::singleton(Tab::ROOT));
    let (doc, _) = analyzer.go(doc, initial, &CondCtx::new());
    doc
}

#[derive(Default)]
struct FlowAnalyzer {
    /// Accumulated flow of each bound sub-document across its use sites.
    flow_of: FxHashMap<DocVar, Flow>,
}

impl FlowAnalyzer {
    fn go(&mut self, doc: AnnDoc, flow: Flow, ctx: &CondCtx) -> (AnnDoc, Flow) {
        match doc {
            AnnDoc::Empty | AnnDoc::Space | AnnDoc::NoSpace | AnnDoc::Newline => (doc, flow),
            AnnDoc::Token { tok, .. } => (
                AnnDoc::Token {
                    flow: flow.clone(),
                    tok,
                },
                flow,
            ),
            AnnDoc::Text { text, .. } => (
                AnnDoc::Text {
                    flow: flow.clone(),
                    text,
                },
                flow,
            ),
            AnnDoc::Concat(a, b) => {
                let (a, flow) = self.go(*a, flow, ctx);
                let (b, flow) = self.go(*b, flow, ctx);
                (AnnDoc::Concat(Box::new(a), Box::new(b)), flow)
            }
            AnnDoc::At {
                might_be_first,
                tab,
                doc,
            } => {
                // Content placed at a tab sits at that tab's column; the
                // surrounding flow no longer determines its position.
                let inner = Some(TabSet::singleton(tab.clone()));
                let (doc, _) = self.go(*doc, inner, ctx);
                (
                    AnnDoc::At {
                        might_be_first,
                        tab,
                        doc: Box::new(doc),
                    },
                    None,
                )
            }
            AnnDoc::NewTab { tab, body } => {
                let (body, flow) = self.go(*body, flow, ctx);
                (
                    AnnDoc::NewTab {
                        tab,
                        body: Box::new(body),
                    },
                    flow,
                )
            }
            AnnDoc::Cond {
                tab,
                inactive,
                active,
            } => {
                // Which branch is taken depends on the tab, so it joins
                // the flow of everything inside.
                let branch_flow = union_flow(flow, Some(TabSet::singleton(tab.clone())));
                match ctx.get(&tab) {
                    Some(CondState::Active) => {
                        let (active, out) = self.go(*active, branch_flow, ctx);
                        (
                            AnnDoc::Cond {
                                tab,
                                inactive,
                                active: Box::new(active),
                            },
                            out,
                        )
                    }
                    Some(CondState::Inactive) => {
                        let (inactive, out) = self.go(*inactive, branch_flow, ctx);
                        (
                            AnnDoc::Cond {
                                tab,
                                inactive: Box::new(inactive),
                                active,
                            },
                            out,
                        )
                    }
                    None => {
                        let (inactive, out_inactive) = self.go(
                            *inactive,
                            branch_flow.clone(),
                            &ctx.with(&tab, CondState::Inactive),
                        );
                        let (active, out_active) =
                            self.go(*active, branch_flow, &ctx.with(&tab, CondState::Active));
                        (
                            AnnDoc::Cond {
                                tab,
                                inactive: Box::new(inactive),
                                active: Box::new(active),
                            },
                            union_flow(out_inactive, out_active),
                        )
                    }
                }
            }
            AnnDoc::Let { var, bound, body } => {
                self.flow_of.insert(var, None);
                let (body, out) = self.go(*body, flow, ctx);
                // Fix-up: re-annotate the shared sub-document under the
                // union of the flows observed at its use sites.
                let accumulated = self
                    .flow_of
                    .get(&var)
                    .cloned()
                    .expect("flow entry present for bound var");
                let (bound, _) = self.go(*bound, accumulated, ctx);
                (
                    AnnDoc::Let {
                        var,
                        bound: Box::new(bound),
                        body: Box::new(body),
                    },
                    out,
                )
            }
            AnnDoc::Var(v) => {
                let entry = self
                    .flow_of
                    .get_mut(&v)
                    .expect("doc var bound before use");
                *entry = union_flow(entry.take(), flow);
                (AnnDoc::Var(v), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::passes::annotate::annotate;
    use tabfmt_strdoc::TabStyle;

    /// Collect the flow sets of text leaves, in textual order.
    fn text_flows(ann: &AnnDoc) -> Vec<Flow> {
        fn go(ann: &AnnDoc, out: &mut Vec<Flow>) {
            match ann {
                AnnDoc::Text { flow, .. } => out.push(flow.clone()),
                AnnDoc::Concat(a, b) => {
                    go(a, out);
                    go(b, out);
                }
                AnnDoc::At { doc, .. } => go(doc, out),
                AnnDoc::NewTab { body, .. } => go(body, out),
                AnnDoc::Cond {
                    inactive, active, ..
                } => {
                    go(inactive, out);
                    go(active, out);
                }
                AnnDoc::Let { bound, body, .. } => {
                    go(bound, out);
                    go(body, out);
                }
                _ => {}
            }
        }
        let mut out = Vec::new();
        go(ann, &mut out);
        out
    }

    fn run(doc: &doc::Doc) -> AnnDoc {
        analyze(annotate(doc))
    }

    #[test]
    fn test_top_level_flows_at_root() {
        let ann = run(&doc::concat(doc::text("a"), doc::text("b")));
        let root = Some(TabSet::singleton(Tab::ROOT));
        assert_eq!(text_flows(&ann), vec![root.clone(), root]);
    }

    #[test]
    fn test_at_pins_flow_to_its_tab() {
        let d = doc::new_tab(&Tab::ROOT, TabStyle::Inplace, |t| {
            doc::concat(
                doc::at(t.clone(), doc::text("a")),
                doc::at(t, doc::text("b")),
            )
        });
        let ann = run(&d);
        let flows = text_flows(&ann);
        assert_eq!(flows.len(), 2);
        for flow in flows {
            let set = flow.expect("attributed");
            assert_eq!(set.len(), 1);
            assert!(!set.first().unwrap().is_root());
        }
    }

    #[test]
    fn test_cond_unions_its_tab() {
        let d = doc::new_tab(&Tab::ROOT, TabStyle::Inplace, |t| {
            doc::cond(t.clone(), doc::text("flat"), doc::text("broken"))
        });
        let ann = run(&d);
        for flow in text_flows(&ann) {
            let set = flow.expect("attributed");
            assert_eq!(set.len(), 2);
            assert!(set.first().unwrap().is_root());
        }
    }

    #[test]
    fn test_token_passes_flow_through() {
        // The second leaf stays attributed even though a leaf precedes it.
        let ann = run(&doc::concat(doc::text("a"), doc::text("b")));
        assert!(text_flows(&ann)[1].is_some());
    }

    #[test]
    fn test_at_consumes_outgoing_flow() {
        let t = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let d = doc::concat(doc::at(t, doc::text("a")), doc::text("b"));
        let flows = text_flows(&run(&d));
        // "b" follows an At, whose outgoing flow is undetermined.
        assert_eq!(flows[1], None);
    }

    #[test]
    fn test_var_accumulates_and_bound_reannotated() {
        let t = Tab::new(&Tab::ROOT, TabStyle::Inplace);
        let d = doc::let_doc(doc::text("shared"), |v| {
            doc::concat(doc::var(v), doc::at(t, doc::var(v)))
        });
        let flows = text_flows(&run(&d));
        // One flow entry, for the single shared Text leaf: the union of
        // the root flow at the first site and the tab at the second.
        assert_eq!(flows.len(), 1);
        let set = flows[0].clone().expect("attributed");
        assert_eq!(set.len(), 2);
        assert!(set.first().unwrap().is_root());
    }
}
