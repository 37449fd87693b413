//! Whole-program dead-code elimination.
//!
//! Functions not reachable from `main` are dropped first. The survivors are then visited callees
//! first: each one is analysed to find which of its variables can influence an observable output
//! (stage outputs, globals, `out` parameters, the return value, `discard`), and every statement
//! or sub-expression that only feeds dead variables is removed. Whether a function has effects
//! outside itself is remembered so that its callers keep calls to it.
//!
//! The pass is conservative: a tree it does not understand is reported as an error instead of
//! being trimmed.

mod call_graph;
mod liveness;
mod prune;

use std::sync::Arc;

use hashbrown::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::ast::{EditError, Node, NodeKind, NodePath};
use crate::operator::Operator;
use crate::symbol::{SymbolId, Variable};
use crate::types::Qualifier;

use call_graph::CallGraph;

#[derive(Debug, Error, PartialEq)]
pub enum DeadCodeError {
    #[error("translation unit has no main function")]
    MissingMain,
    #[error("function {id} is called but never defined")]
    UnknownFunction { id: SymbolId },
    #[error("unexpected {kind} node")]
    UnexpectedNode { kind: NodeKind },
    #[error("break or continue outside of a loop or switch")]
    BranchOutsideLoop,
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// What one run of [`remove_dead_code`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeadCodeStats {
    pub functions_removed: usize,
    pub edits_applied: usize,
}

impl DeadCodeStats {
    pub fn is_noop(&self) -> bool {
        self.functions_removed == 0 && self.edits_applied == 0
    }
}

/// Removes unreachable functions and dead statements from the translation unit `root`.
pub fn remove_dead_code(root: &mut Node) -> Result<DeadCodeStats, DeadCodeError> {
    let mut stats = DeadCodeStats::default();
    stats.functions_removed += CallGraph::collect(root)?.remove_unreachable(root)?;

    let graph = CallGraph::collect(root)?;
    let mut side_effects: HashMap<SymbolId, bool> = HashMap::new();
    for id in graph.order()? {
        let index = graph
            .definition_index(id)
            .ok_or(DeadCodeError::UnknownFunction { id })?;
        let at = NodePath(vec![index]);
        let definition = root.child(index).ok_or(DeadCodeError::UnexpectedNode {
            kind: root.kind(),
        })?;

        let facts = liveness::analyse(id, definition, &at, &side_effects)?;
        side_effects.insert(id, facts.has_side_effects);
        let edits = prune::collect(definition, at, &facts, &side_effects)?;
        stats.edits_applied += edits.apply(root)?;
    }

    // Calls removed above can leave more functions unreachable.
    stats.functions_removed += CallGraph::collect(root)?.remove_unreachable(root)?;

    debug!(
        functions_removed = stats.functions_removed,
        edits_applied = stats.edits_applied,
        "dead code removed"
    );
    Ok(stats)
}

/// How a write to a variable is observable from outside the function doing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    /// Only visible to later statements of the same function.
    Local,
    /// Visible to the caller through an `out` parameter or the return value.
    Caller,
    /// Visible to other functions or the pipeline: stage outputs, globals, shared memory.
    Implicit,
}

fn output_kind(qualifier: Qualifier) -> Output {
    if qualifier.is_shader_output()
        || qualifier.is_builtin_output()
        || matches!(qualifier, Qualifier::Global | Qualifier::Shared)
    {
        Output::Implicit
    } else if qualifier.is_parameter_out() {
        Output::Caller
    } else {
        Output::Local
    }
}

fn is_index(op: Operator) -> bool {
    matches!(
        op,
        Operator::IndexDirect | Operator::IndexIndirect | Operator::IndexDirectStruct
    )
}

/// Variable written through an lvalue such as `v`, `v.xy`, `a[i]` or `s.f[2]`.
fn written_variable(lvalue: &Node) -> Result<&Arc<Variable>, DeadCodeError> {
    let mut node = lvalue;
    loop {
        match node {
            Node::Symbol(s) => return Ok(&s.variable),
            Node::Binary(b) if is_index(b.op) => node = &b.left,
            Node::Swizzle(s) => node = &s.operand,
            other => return Err(DeadCodeError::UnexpectedNode { kind: other.kind() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::symbol::{IdAllocator, Parameter};
    use crate::types::{BasicType, Precision, Type};
    use pretty_assertions::assert_eq;

    struct Fixture {
        ids: IdAllocator,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ids: IdAllocator::starting_at(1000),
            }
        }

        fn var(&mut self, name: &str, qualifier: Qualifier) -> Arc<Variable> {
            self.ids.new_variable(
                name,
                Type::new(BasicType::Float, Precision::Medium, qualifier, 1),
            )
        }

        fn main(&mut self) -> Arc<crate::symbol::Function> {
            self.ids.new_function("main", Type::void(), Vec::new())
        }
    }

    fn main_body(root: &Node) -> Vec<Node> {
        let Some(Node::FunctionDefinition(def)) = root.as_block().and_then(|b| b.statements.last())
        else {
            panic!("expected main as the last statement");
        };
        def.body.as_block().map(|b| b.statements.clone()).unwrap_or_default()
    }

    #[test]
    fn call_writing_only_a_dead_out_argument_is_removed() {
        let mut f = Fixture::new();
        let color = f.var("color", Qualifier::FragmentOut);
        let u = f.var("u", Qualifier::Uniform);
        let unused = f.var("unused", Qualifier::Temporary);
        let x = f.var("x", Qualifier::Out);
        let foo = f.ids.new_function(
            "foo",
            Type::void(),
            vec![Parameter::new("x", x.ty.clone())],
        );
        let main = f.main();

        let mut root = build::block(vec![
            build::function(&foo, vec![build::assign(build::symbol(&x), build::float(1.0))]),
            build::function(
                &main,
                vec![
                    build::declare(&unused),
                    build::call(&foo, vec![build::symbol(&unused)]),
                    build::assign(build::symbol(&color), build::symbol(&u)),
                ],
            ),
        ]);

        let stats = remove_dead_code(&mut root).expect("dead code pass");
        assert_eq!(stats.functions_removed, 1);
        assert_eq!(
            root,
            build::block(vec![build::function(
                &main,
                vec![
                    build::declare(&unused),
                    build::assign(build::symbol(&color), build::symbol(&u)),
                ],
            )])
        );
    }

    #[test]
    fn dead_variable_passed_to_a_kept_call_stays_declared() {
        let mut f = Fixture::new();
        let counter = f.var("counter", Qualifier::Global);
        let t = f.var("t", Qualifier::Temporary);
        let x = f.var("x", Qualifier::Out);
        let bump = f.ids.new_function(
            "bump",
            Type::void(),
            vec![Parameter::new("x", x.ty.clone())],
        );
        let main = f.main();
        let call = build::call(&bump, vec![build::symbol(&t)]);

        let mut root = build::block(vec![
            build::declare(&counter),
            build::function(
                &bump,
                vec![
                    build::assign(build::symbol(&x), build::float(1.0)),
                    build::binary(Operator::AddAssign, build::symbol(&counter), build::float(1.0)),
                ],
            ),
            build::function(
                &main,
                vec![build::declare_init(&t, build::float(0.0)), call.clone()],
            ),
        ]);

        remove_dead_code(&mut root).expect("dead code pass");
        assert_eq!(main_body(&root), vec![build::declare(&t), call]);
    }

    #[test]
    fn dead_declarator_named_only_by_removed_statements_goes() {
        let mut f = Fixture::new();
        let color = f.var("color", Qualifier::FragmentOut);
        let t = f.var("t", Qualifier::Temporary);
        let main = f.main();
        let live = build::assign(build::symbol(&color), build::float(1.0));
        let mut root = build::block(vec![build::function(
            &main,
            vec![
                build::declare_init(&t, build::float(0.0)),
                build::binary(Operator::AddAssign, build::symbol(&t), build::float(1.0)),
                live.clone(),
            ],
        )]);

        remove_dead_code(&mut root).expect("dead code pass");
        assert_eq!(main_body(&root), vec![live]);
    }

    #[test]
    fn discard_keeps_its_condition() {
        let mut f = Fixture::new();
        let u = f.var("u", Qualifier::Uniform);
        let t = f.var("t", Qualifier::Temporary);
        let main = f.main();
        let guarded = build::if_else(
            build::binary(Operator::GreaterThan, build::symbol(&u), build::float(0.5)),
            build::block(vec![build::discard()]),
            None,
        );
        let mut root = build::block(vec![build::function(
            &main,
            vec![guarded.clone(), build::declare_init(&t, build::symbol(&u))],
        )]);

        remove_dead_code(&mut root).expect("dead code pass");
        assert_eq!(main_body(&root), vec![guarded]);
    }

    #[test]
    fn second_run_is_a_fixed_point() {
        let mut f = Fixture::new();
        let color = f.var("color", Qualifier::FragmentOut);
        let a = f.var("a", Qualifier::Temporary);
        let b = f.var("b", Qualifier::Temporary);
        let i = f.ids.new_variable(
            "i",
            Type::new(BasicType::Int, Precision::High, Qualifier::Temporary, 1),
        );
        let main = f.main();
        let mut root = build::block(vec![build::function(
            &main,
            vec![
                build::declare_init(&a, build::float(0.0)),
                build::declare_init(&b, build::float(2.0)),
                build::for_loop(
                    Some(build::declare_init(&i, build::int(0))),
                    Some(build::binary(
                        Operator::LessThan,
                        build::symbol(&i),
                        build::int(4),
                    )),
                    Some(build::unary(Operator::PreIncrement, build::symbol(&i))),
                    build::block(vec![
                        build::binary(Operator::AddAssign, build::symbol(&a), build::float(1.0)),
                        build::binary(Operator::AddAssign, build::symbol(&b), build::symbol(&a)),
                    ]),
                ),
                build::assign(build::symbol(&color), build::symbol(&a)),
            ],
        )]);

        let first = remove_dead_code(&mut root).expect("first run");
        assert_eq!(first.edits_applied, 2);
        let after_first = root.clone();
        let second = remove_dead_code(&mut root).expect("second run");
        assert!(second.is_noop(), "{second:?}");
        assert_eq!(root, after_first);
    }

    #[test]
    fn unreachable_functions_and_prototypes_go() {
        let mut f = Fixture::new();
        let helper = f.ids.new_function("helper", Type::void(), Vec::new());
        let main = f.main();
        let mut root = build::block(vec![
            build::prototype(&helper),
            build::function(&helper, vec![]),
            build::function(&main, vec![]),
        ]);
        let stats = remove_dead_code(&mut root).expect("dead code pass");
        assert_eq!(stats.functions_removed, 1);
        assert_eq!(root, build::block(vec![build::function(&main, vec![])]));
    }

    #[test]
    fn missing_main_is_an_error() {
        let mut f = Fixture::new();
        let helper = f.ids.new_function("helper", Type::void(), Vec::new());
        let mut root = build::block(vec![build::function(&helper, vec![])]);
        assert_eq!(remove_dead_code(&mut root), Err(DeadCodeError::MissingMain));
    }

    #[test]
    fn only_dead_declarators_are_dropped() {
        let mut f = Fixture::new();
        let color = f.var("color", Qualifier::FragmentOut);
        let a = f.var("a", Qualifier::Temporary);
        let b = f.var("b", Qualifier::Temporary);
        let main = f.main();
        let init = |v: &Arc<Variable>, value| {
            build::binary(Operator::Initialize, build::symbol(v), build::float(value))
        };
        let mut root = build::block(vec![build::function(
            &main,
            vec![
                build::declaration(vec![init(&a, 1.0), init(&b, 2.0)]),
                build::assign(build::symbol(&color), build::symbol(&b)),
            ],
        )]);
        remove_dead_code(&mut root).expect("dead code pass");
        assert_eq!(
            main_body(&root),
            vec![
                build::declaration(vec![init(&b, 2.0)]),
                build::assign(build::symbol(&color), build::symbol(&b)),
            ]
        );
    }

    #[test]
    fn dead_comma_operand_is_spliced_out() {
        let mut f = Fixture::new();
        let color = f.var("color", Qualifier::FragmentOut);
        let dead = f.var("dead", Qualifier::Temporary);
        let main = f.main();
        let live = build::assign(build::symbol(&color), build::float(1.0));
        let mut root = build::block(vec![build::function(
            &main,
            vec![
                build::declare(&dead),
                build::comma(
                    build::assign(build::symbol(&dead), build::float(2.0)),
                    live.clone(),
                ),
            ],
        )]);
        remove_dead_code(&mut root).expect("dead code pass");
        assert_eq!(main_body(&root), vec![build::declare(&dead), live]);
    }

    #[test]
    fn side_effects_of_callees_keep_the_call() {
        let mut f = Fixture::new();
        let counter = f.var("counter", Qualifier::Global);
        let bump = f.ids.new_function("bump", Type::void(), Vec::new());
        let main = f.main();
        let call = build::call(&bump, vec![]);
        let mut root = build::block(vec![
            build::declare(&counter),
            build::function(
                &bump,
                vec![build::binary(
                    Operator::AddAssign,
                    build::symbol(&counter),
                    build::float(1.0),
                )],
            ),
            build::function(&main, vec![call.clone()]),
        ]);
        let before = root.clone();
        let stats = remove_dead_code(&mut root).expect("dead code pass");
        assert!(stats.is_noop());
        assert_eq!(root, before);
        assert_eq!(main_body(&root), vec![call]);
    }

    #[test]
    fn break_outside_a_loop_is_rejected() {
        let mut f = Fixture::new();
        let main = f.main();
        let mut root = build::block(vec![build::function(&main, vec![build::break_()])]);
        assert_eq!(
            remove_dead_code(&mut root),
            Err(DeadCodeError::BranchOutsideLoop)
        );
    }
}
