//! Mermaid flowchart rendering of a compiled graph.
//!
//! Static edges are solid arrows, conditional targets dotted arrows.

use std::fmt::Write as _;

use super::compiled::CompiledGraph;
use super::state_graph::{Successor, END, START};

impl CompiledGraph {
    /// Renders the graph as a Mermaid `flowchart TD` definition.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");
        let _ = writeln!(out, "    {}([start])", START);
        for id in &self.order {
            let _ = writeln!(out, "    {}[{}]", id, id);
        }
        let reaches_end = self
            .order
            .iter()
            .filter_map(|id| self.successors.get(id))
            .any(|s| s.targets().contains(&END));
        if reaches_end {
            let _ = writeln!(out, "    {}([end])", END);
        }

        let _ = writeln!(out, "    {} --> {}", START, self.entry);
        for id in &self.order {
            match self.successors.get(id) {
                Some(Successor::Static(to)) => {
                    let _ = writeln!(out, "    {} --> {}", id, to);
                }
                Some(Successor::Conditional { targets, .. }) => {
                    for to in targets {
                        let _ = writeln!(out, "    {} -.-> {}", id, to);
                    }
                }
                None => {}
            }
        }
        out
    }
}
