//! Graph builder: nodes plus static and conditional edges.
//!
//! Add nodes with `add_node`, wire them with `add_edge(from, to)` (use [`START`]
//! for the entry and [`END`] for exit) or `add_conditional_edges`, then
//! `compile` to get a [`CompiledGraph`]. Every structural problem is reported
//! by `compile`; the builder methods themselves never fail.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::state::ConversationState;

use super::compiled::CompiledGraph;
use super::config::GraphConfig;
use super::node::Node;
use super::node_middleware::NodeMiddleware;
use super::validation_error::GraphValidationError;

/// Sentinel for graph entry: use as `from` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to` in `add_edge(node_id, END)` or as a
/// conditional target.
pub const END: &str = "__end__";

/// Routing function: pure, evaluated over the post-update state, returns a
/// declared target name.
pub type RouteFn = Arc<dyn Fn(&ConversationState) -> String + Send + Sync>;

/// How the executor picks the node after `from`.
#[derive(Clone)]
pub enum Successor {
    /// Always go to this node (or [`END`]).
    Static(String),
    /// Ask the router; its answer must be one of `targets`.
    Conditional { router: RouteFn, targets: Vec<String> },
}

impl Successor {
    /// Every node name this rule can lead to (including [`END`]).
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Successor::Static(to) => vec![to.as_str()],
            Successor::Conditional { targets, .. } => targets.iter().map(String::as_str).collect(),
        }
    }
}

impl std::fmt::Debug for Successor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Successor::Static(to) => write!(f, "Static({})", to),
            Successor::Conditional { targets, .. } => write!(f, "Conditional({:?})", targets),
        }
    }
}

/// Graph builder for one conversation graph.
///
/// **Interaction**: Accepts `Arc<dyn Node>`; produces `CompiledGraph`.
pub struct StateGraph {
    nodes: HashMap<String, Arc<dyn Node>>,
    /// Node ids in insertion order; keeps validation and rendering deterministic.
    order: Vec<String>,
    successors: HashMap<String, Successor>,
    entry: Option<String>,
    middleware: Option<Arc<dyn NodeMiddleware>>,
    config: GraphConfig,
    /// Problems found while building, reported by `compile`.
    deferred: Vec<GraphValidationError>,
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StateGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            order: Vec::new(),
            successors: HashMap::new(),
            entry: None,
            middleware: None,
            config: GraphConfig::default(),
            deferred: Vec::new(),
        }
    }

    /// Wraps every node run in `middleware`.
    pub fn with_middleware(self, middleware: Arc<dyn NodeMiddleware>) -> Self {
        Self {
            middleware: Some(middleware),
            ..self
        }
    }

    pub fn with_config(self, config: GraphConfig) -> Self {
        Self { config, ..self }
    }

    /// Adds a node under `id`. A second node with the same id is a build error.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node>) -> &mut Self {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            self.deferred.push(GraphValidationError::DuplicateNode(id));
            return self;
        }
        self.order.push(id.clone());
        self.nodes.insert(id, node);
        self
    }

    /// Adds a static edge. `add_edge(START, id)` declares the start node.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        let from = from.into();
        let to = to.into();
        if from == START {
            return self.set_entry_point(to);
        }
        self.set_successor(from, Successor::Static(to))
    }

    pub fn set_entry_point(&mut self, id: impl Into<String>) -> &mut Self {
        if self.entry.is_some() {
            self.deferred
                .push(GraphValidationError::DuplicateSuccessor(START.to_string()));
        } else {
            self.entry = Some(id.into());
        }
        self
    }

    /// Adds a conditional edge: after `from` runs, `router` picks one of `targets`.
    pub fn add_conditional_edges<F, I, T>(
        &mut self,
        from: impl Into<String>,
        router: F,
        targets: I,
    ) -> &mut Self
    where
        F: Fn(&ConversationState) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let targets: Vec<String> = targets.into_iter().map(Into::into).collect();
        self.set_successor(
            from.into(),
            Successor::Conditional {
                router: Arc::new(router),
                targets,
            },
        )
    }

    fn set_successor(&mut self, from: String, successor: Successor) -> &mut Self {
        if self.successors.contains_key(&from) {
            self.deferred
                .push(GraphValidationError::DuplicateSuccessor(from));
        } else {
            self.successors.insert(from, successor);
        }
        self
    }

    /// Validates the graph and freezes it into an executable form.
    ///
    /// Checks, in order: builder problems (duplicates), start node, edge
    /// endpoints, empty conditional targets, cycles with no turn-completing
    /// node, and that every tool-call emitter can reach a tool resolver.
    pub fn compile(self) -> Result<CompiledGraph, GraphValidationError> {
        if let Some(err) = self.deferred.first() {
            return Err(err.clone());
        }
        let entry = self.entry.clone().ok_or(GraphValidationError::MissingStart)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphValidationError::StartNotDeclared(entry));
        }
        self.check_edges()?;
        self.check_cycles()?;
        self.check_tool_resolution()?;

        Ok(CompiledGraph {
            nodes: self.nodes,
            order: self.order,
            successors: self.successors,
            entry,
            middleware: self.middleware,
            config: self.config,
        })
    }

    fn check_edges(&self) -> Result<(), GraphValidationError> {
        for from in self.sorted_sources() {
            if !self.nodes.contains_key(from) {
                return Err(GraphValidationError::NodeNotFound(from.to_string()));
            }
            let successor = &self.successors[from];
            if let Successor::Conditional { targets, .. } = successor {
                if targets.is_empty() {
                    return Err(GraphValidationError::EmptyRouteTargets(from.to_string()));
                }
            }
            for to in successor.targets() {
                if to != END && !self.nodes.contains_key(to) {
                    return Err(GraphValidationError::NodeNotFound(to.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Edge sources in node insertion order, then unknown sources sorted.
    fn sorted_sources(&self) -> Vec<&str> {
        let mut known: Vec<&str> = self
            .order
            .iter()
            .map(String::as_str)
            .filter(|id| self.successors.contains_key(*id))
            .collect();
        let mut unknown: Vec<&str> = self
            .successors
            .keys()
            .map(String::as_str)
            .filter(|id| !self.nodes.contains_key(*id))
            .collect();
        unknown.sort_unstable();
        known.extend(unknown);
        known
    }

    fn neighbours(&self, id: &str) -> Vec<&str> {
        self.successors
            .get(id)
            .map(|s| s.targets().into_iter().filter(|t| *t != END).collect())
            .unwrap_or_default()
    }

    /// A cycle is allowed iff at least one node on it can complete the turn,
    /// so only the subgraph of non-completing nodes is searched.
    fn check_cycles(&self) -> Result<(), GraphValidationError> {
        let unguarded: HashSet<&str> = self
            .order
            .iter()
            .map(String::as_str)
            .filter(|id| !self.nodes[*id].can_complete_turn())
            .collect();

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }
        let mut marks: HashMap<&str, Mark> = HashMap::new();

        for root in self.order.iter().map(String::as_str) {
            if !unguarded.contains(root) || marks.contains_key(root) {
                continue;
            }
            // Iterative DFS; `path` mirrors the stack of nodes being visited.
            let mut path: Vec<&str> = vec![root];
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
            marks.insert(root, Mark::Visiting);
            while let Some((node, idx)) = stack.last().copied() {
                let next: Vec<&str> = self
                    .neighbours(node)
                    .into_iter()
                    .filter(|n| unguarded.contains(n))
                    .collect();
                if idx >= next.len() {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                    path.pop();
                    continue;
                }
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let n = next[idx];
                match marks.get(n) {
                    Some(Mark::Visiting) => {
                        let start = path.iter().position(|p| *p == n).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|s| s.to_string()).collect();
                        cycle.push(n.to_string());
                        return Err(GraphValidationError::UnguardedCycle(cycle));
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(n, Mark::Visiting);
                        stack.push((n, 0));
                        path.push(n);
                    }
                }
            }
        }
        Ok(())
    }

    fn check_tool_resolution(&self) -> Result<(), GraphValidationError> {
        for id in &self.order {
            if !self.nodes[id].emits_tool_calls() {
                continue;
            }
            let mut seen: HashSet<&str> = HashSet::new();
            let mut queue: VecDeque<&str> = self.neighbours(id).into_iter().collect();
            let mut resolved = false;
            while let Some(n) = queue.pop_front() {
                if !seen.insert(n) {
                    continue;
                }
                if self.nodes[n].resolves_tool_calls() {
                    resolved = true;
                    break;
                }
                queue.extend(self.neighbours(n));
            }
            if !resolved {
                return Err(GraphValidationError::UnresolvedToolCalls(id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::FnNode;
    use crate::state::StateUpdate;

    fn plain(id: &str) -> Arc<dyn Node> {
        Arc::new(FnNode::new(id, |_| StateUpdate::new()))
    }

    fn finisher(id: &str) -> Arc<dyn Node> {
        Arc::new(FnNode::new(id, |_| StateUpdate::new().complete_turn()).can_complete())
    }

    #[test]
    fn compile_requires_start() {
        let mut g = StateGraph::new();
        g.add_node("a", plain("a"));
        assert_eq!(g.compile().err(), Some(GraphValidationError::MissingStart));
    }

    #[test]
    fn compile_rejects_undeclared_start() {
        let mut g = StateGraph::new();
        g.add_node("a", plain("a"));
        g.add_edge(START, "ghost");
        assert_eq!(
            g.compile().err(),
            Some(GraphValidationError::StartNotDeclared("ghost".into()))
        );
    }

    #[test]
    fn compile_rejects_duplicate_node_and_successor() {
        let mut g = StateGraph::new();
        g.add_node("a", plain("a"));
        g.add_node("a", plain("a"));
        assert_eq!(
            g.compile().err(),
            Some(GraphValidationError::DuplicateNode("a".into()))
        );

        let mut g = StateGraph::new();
        g.add_node("a", plain("a"));
        g.add_edge(START, "a");
        g.add_edge("a", END);
        g.add_conditional_edges("a", |_| END.to_string(), [END]);
        assert_eq!(
            g.compile().err(),
            Some(GraphValidationError::DuplicateSuccessor("a".into()))
        );
    }

    #[test]
    fn compile_rejects_empty_route_targets() {
        let mut g = StateGraph::new();
        g.add_node("a", plain("a"));
        g.add_edge(START, "a");
        g.add_conditional_edges("a", |_| END.to_string(), Vec::<String>::new());
        assert_eq!(
            g.compile().err(),
            Some(GraphValidationError::EmptyRouteTargets("a".into()))
        );
    }

    /// **Scenario**: The reported cycle path starts and ends at the same node.
    #[test]
    fn unguarded_cycle_reports_path() {
        let mut g = StateGraph::new();
        g.add_node("a", plain("a"));
        g.add_node("b", plain("b"));
        g.add_node("c", plain("c"));
        g.add_edge(START, "a");
        g.add_edge("a", "b");
        g.add_edge("b", "c");
        g.add_edge("c", "b");
        match g.compile() {
            Err(GraphValidationError::UnguardedCycle(path)) => {
                assert_eq!(path, vec!["b", "c", "b"])
            }
            other => panic!("expected UnguardedCycle, got {:?}", other.err()),
        }
    }

    #[test]
    fn self_loop_without_exit_is_rejected_and_with_exit_accepted() {
        let mut g = StateGraph::new();
        g.add_node("loop", plain("loop"));
        g.add_edge(START, "loop");
        g.add_conditional_edges("loop", |_| "loop".to_string(), ["loop", END]);
        assert!(matches!(
            g.compile(),
            Err(GraphValidationError::UnguardedCycle(_))
        ));

        let mut g = StateGraph::new();
        g.add_node("loop", finisher("loop"));
        g.add_edge(START, "loop");
        g.add_conditional_edges("loop", |_| "loop".to_string(), ["loop", END]);
        assert!(g.compile().is_ok());
    }

    #[test]
    fn emitter_without_reachable_resolver_is_rejected() {
        let mut g = StateGraph::new();
        g.add_node(
            "model",
            Arc::new(FnNode::new("model", |_| StateUpdate::new()).can_complete().emitting_tool_calls()),
        );
        g.add_edge(START, "model");
        g.add_edge("model", END);
        assert_eq!(
            g.compile().err(),
            Some(GraphValidationError::UnresolvedToolCalls("model".into()))
        );
    }
}
