use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::ast::{AggregateNode, EditList, Node, NodeKind, NodePath, Visit, Visitor, Walker};
use crate::operator::Operator;
use crate::symbol::SymbolId;

use super::DeadCodeError;

/// Direct calls between the functions defined at the top level of a translation unit.
#[derive(Debug, Default)]
pub(super) struct CallGraph {
    main: Option<SymbolId>,
    names: BTreeMap<SymbolId, String>,
    /// Root statement index of each definition.
    definitions: BTreeMap<SymbolId, usize>,
    prototypes: BTreeMap<SymbolId, Vec<usize>>,
    callees: BTreeMap<SymbolId, BTreeSet<SymbolId>>,
}

#[derive(Default)]
struct CallCollector {
    callees: BTreeSet<SymbolId>,
    error: Option<DeadCodeError>,
}

impl<'a> Visitor<'a> for CallCollector {
    fn visit_aggregate(
        &mut self,
        _walker: &mut Walker<'a>,
        visit: Visit,
        node: &'a AggregateNode,
    ) -> bool {
        if visit != Visit::Pre
            || !matches!(
                node.op,
                Operator::CallFunctionInAst | Operator::CallInternalRawFunction
            )
        {
            return true;
        }
        match &node.function {
            Some(function) => {
                self.callees.insert(function.id);
            }
            None => {
                self.error = Some(DeadCodeError::UnexpectedNode {
                    kind: NodeKind::Aggregate,
                });
            }
        }
        true
    }
}

impl CallGraph {
    pub fn collect(root: &Node) -> Result<Self, DeadCodeError> {
        let Node::Block(unit) = root else {
            return Err(DeadCodeError::UnexpectedNode { kind: root.kind() });
        };

        let mut graph = CallGraph::default();
        for (index, statement) in unit.statements.iter().enumerate() {
            match statement {
                Node::Prototype(p) => {
                    graph.prototypes.entry(p.function.id).or_default().push(index);
                }
                Node::FunctionDefinition(def) => {
                    let function = def.function();
                    if function.is_main() {
                        graph.main = Some(function.id);
                    }
                    graph.names.insert(function.id, function.name.clone());
                    graph.definitions.insert(function.id, index);

                    let mut calls = CallCollector::default();
                    Walker::new().walk(&mut calls, statement);
                    if let Some(err) = calls.error {
                        return Err(err);
                    }
                    graph.callees.insert(function.id, calls.callees);
                }
                _ => {}
            }
        }
        Ok(graph)
    }

    pub fn definition_index(&self, id: SymbolId) -> Option<usize> {
        self.definitions.get(&id).copied()
    }

    /// Functions reachable from `main`, every callee before its callers. `main` comes last.
    pub fn order(&self) -> Result<Vec<SymbolId>, DeadCodeError> {
        let main = self.main.ok_or(DeadCodeError::MissingMain)?;
        let mut visited = BTreeSet::new();
        let mut order = Vec::new();
        self.post_order(main, &mut visited, &mut order);
        Ok(order)
    }

    fn post_order(&self, id: SymbolId, visited: &mut BTreeSet<SymbolId>, order: &mut Vec<SymbolId>) {
        if !visited.insert(id) {
            return;
        }
        for &callee in self.callees.get(&id).into_iter().flatten() {
            self.post_order(callee, visited, order);
        }
        order.push(id);
    }

    /// Deletes definitions and prototypes of functions `main` never reaches. Returns how many
    /// functions were removed.
    pub fn remove_unreachable(&self, root: &mut Node) -> Result<usize, DeadCodeError> {
        let reachable: BTreeSet<SymbolId> = self.order()?.into_iter().collect();

        let mut edits = EditList::new();
        let mut removed = 0;
        for (&id, &index) in &self.definitions {
            if reachable.contains(&id) {
                continue;
            }
            trace!(function = %id, name = self.names.get(&id).map(String::as_str), "removing unreachable function");
            removed += 1;
            edits.remove(NodePath(vec![index]));
            for &prototype in self.prototypes.get(&id).into_iter().flatten() {
                edits.remove(NodePath(vec![prototype]));
            }
        }
        if removed > 0 {
            edits.apply(root)?;
            debug!(removed, "removed unreachable functions");
        }
        Ok(removed)
    }
}
