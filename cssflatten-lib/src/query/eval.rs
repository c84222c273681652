use super::xpath::{Axis, Expr, Function, LocationPath, NodeTest, Step};
use crate::dom::dom_tree::{self, Node, NodeHandle};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::rc::Rc;

type NodeKey = *const std::cell::RefCell<Node>;

fn key(node: &NodeHandle) -> NodeKey {
    Rc::as_ptr(node)
}

/// Result of evaluating a predicate sub-expression.
#[derive(Debug, Clone)]
enum Value {
    Boolean(bool),
    Number(f64),
    Text(String),
    /// `@name`: the attribute's value, or `None` for an empty node-set.
    Attribute(Option<String>),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => !s.is_empty(),
            Value::Attribute(a) => a.is_some(),
        }
    }

    fn number(&self) -> f64 {
        match self {
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Text(s) | Value::Attribute(Some(s)) => s.trim().parse().unwrap_or(f64::NAN),
            Value::Attribute(None) => f64::NAN,
        }
    }

    fn string(&self) -> String {
        match self {
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Text(s) | Value::Attribute(Some(s)) => s.clone(),
            Value::Attribute(None) => String::new(),
        }
    }
}

/// `=` and `!=` with node-set semantics: a missing attribute compares unequal to everything.
fn compare(left: &Value, right: &Value, negate: bool) -> bool {
    match (left, right) {
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => (left.truthy() == right.truthy()) != negate,
        (Value::Attribute(None), _) | (_, Value::Attribute(None)) => false,
        (Value::Number(_), _) | (_, Value::Number(_)) => (left.number() == right.number()) != negate,
        _ => (left.string() == right.string()) != negate,
    }
}

struct Context<'a> {
    node: &'a NodeHandle,
    position: usize,
    size: usize,
}

fn evaluate_expr(expr: &Expr, ctx: &Context<'_>) -> Value {
    match expr {
        Expr::Number(n) => Value::Number(*n),
        Expr::Literal(s) => Value::Text(s.clone()),
        Expr::Attribute(name) => Value::Attribute(
            ctx.node
                .borrow()
                .as_element()
                .and_then(|elem| elem.attr(name))
                .map(str::to_string),
        ),
        Expr::Eq(l, r) => Value::Boolean(compare(&evaluate_expr(l, ctx), &evaluate_expr(r, ctx), false)),
        Expr::NotEq(l, r) => Value::Boolean(compare(&evaluate_expr(l, ctx), &evaluate_expr(r, ctx), true)),
        Expr::And(l, r) => Value::Boolean(evaluate_expr(l, ctx).truthy() && evaluate_expr(r, ctx).truthy()),
        Expr::Or(l, r) => Value::Boolean(evaluate_expr(l, ctx).truthy() || evaluate_expr(r, ctx).truthy()),
        Expr::Call(function, args) => call(*function, args, ctx),
    }
}

fn call(function: Function, args: &[Expr], ctx: &Context<'_>) -> Value {
    let text = |index: usize| {
        args.get(index)
            .map(|arg| evaluate_expr(arg, ctx).string())
            .unwrap_or_default()
    };
    match function {
        Function::Contains => Value::Boolean(text(0).contains(&text(1))),
        Function::StartsWith => Value::Boolean(text(0).starts_with(&text(1))),
        Function::Concat => Value::Text((0..args.len()).map(text).collect()),
        Function::Not => Value::Boolean(
            !args
                .first()
                .map(|arg| evaluate_expr(arg, ctx).truthy())
                .unwrap_or(false),
        ),
        Function::Position => Value::Number(ctx.position as f64),
        Function::Last => Value::Number(ctx.size as f64),
    }
}

fn predicate_holds(predicate: &Expr, ctx: &Context<'_>) -> bool {
    match evaluate_expr(predicate, ctx) {
        Value::Number(n) => n == ctx.position as f64,
        other => other.truthy(),
    }
}

fn is_root_or_element(node: &NodeHandle) -> bool {
    matches!(&*node.borrow(), Node::DocumentRoot(_) | Node::Element(_))
}

/// Per-evaluation lookups built in one pass over the tree.
struct TreeIndex {
    /// Pre-order position of every node.
    order: HashMap<NodeKey, usize>,
    /// Position of every node among its parent's children (text included).
    child_index: HashMap<NodeKey, usize>,
}

impl TreeIndex {
    fn build(root: &NodeHandle) -> Self {
        let mut order = HashMap::new();
        let mut child_index = HashMap::new();
        for (position, node) in dom_tree::descendants(root).iter().enumerate() {
            order.insert(key(node), position);
            if let Some(children) = node.borrow().children() {
                for (index, child) in children.iter().enumerate() {
                    child_index.insert(key(child), index);
                }
            }
        }
        TreeIndex { order, child_index }
    }
}

/// Element siblings of one node, walked outward from it on demand.
struct Siblings {
    parent: NodeHandle,
    remaining: Range<usize>,
    forward: bool,
}

impl Siblings {
    fn new(node: &NodeHandle, forward: bool, index: &TreeIndex) -> Option<Self> {
        let parent = dom_tree::parent_of(node)?;
        let position = *index.child_index.get(&key(node))?;
        let len = parent.borrow().children().map_or(0, Vec::len);
        let remaining = if forward { position + 1..len } else { 0..position };
        Some(Siblings {
            parent,
            remaining,
            forward,
        })
    }
}

impl Iterator for Siblings {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        loop {
            let position = if self.forward {
                self.remaining.next()
            } else {
                self.remaining.next_back()
            }?;
            let child = self
                .parent
                .borrow()
                .children()
                .and_then(|children| children.get(position).cloned());
            if let Some(child) = child {
                if child.borrow().is_element() {
                    return Some(child);
                }
            }
        }
    }
}

/// Nodes reachable along `axis`, in axis order (reverse axes nearest first).
fn axis_nodes(
    node: &NodeHandle,
    axis: Axis,
    index: &TreeIndex,
) -> Box<dyn Iterator<Item = NodeHandle>> {
    match axis {
        Axis::Child => Box::new(dom_tree::element_children(node).into_iter()),
        Axis::Descendant => Box::new(
            dom_tree::descendants(node)
                .into_iter()
                .skip(1)
                .filter(is_root_or_element),
        ),
        Axis::DescendantOrSelf => Box::new(
            dom_tree::descendants(node)
                .into_iter()
                .filter(is_root_or_element),
        ),
        Axis::SelfAxis => Box::new(std::iter::once(Rc::clone(node))),
        Axis::Parent => Box::new(dom_tree::parent_of(node).into_iter()),
        Axis::FollowingSibling => Box::new(Siblings::new(node, true, index).into_iter().flatten()),
        Axis::PrecedingSibling => Box::new(Siblings::new(node, false, index).into_iter().flatten()),
    }
}

fn matches_test(node: &NodeHandle, test: &NodeTest) -> bool {
    match (test, &*node.borrow()) {
        (NodeTest::AnyNode, _) => true,
        (NodeTest::AnyElement, Node::Element(_)) => true,
        (NodeTest::Name(name), Node::Element(elem)) => elem.tag.eq_ignore_ascii_case(name),
        _ => false,
    }
}

/// The candidate at 1-based `position`, if it is a whole number in range.
fn at_position(
    mut candidates: impl Iterator<Item = NodeHandle>,
    position: f64,
) -> Vec<NodeHandle> {
    if position < 1.0 || position.fract() != 0.0 {
        return Vec::new();
    }
    candidates.nth(position as usize - 1).into_iter().collect()
}

fn apply_step(node: &NodeHandle, step: &Step, index: &TreeIndex) -> Vec<NodeHandle> {
    let candidates = axis_nodes(node, step.axis, index)
        .filter(|candidate| matches_test(candidate, &step.test));

    // A leading `[n]` picks one candidate without walking the rest of the axis.
    let (mut selected, predicates) = match step.predicates.split_first() {
        Some((Expr::Number(position), rest)) => (at_position(candidates, *position), rest),
        _ => (candidates.collect::<Vec<_>>(), step.predicates.as_slice()),
    };

    for predicate in predicates {
        let size = selected.len();
        selected = selected
            .into_iter()
            .enumerate()
            .filter(|(offset, candidate)| {
                predicate_holds(
                    predicate,
                    &Context {
                        node: candidate,
                        position: offset + 1,
                        size,
                    },
                )
            })
            .map(|(_, candidate)| candidate)
            .collect();
    }
    selected
}

/// Evaluates `path` from `root` and returns matching elements in document order.
pub(super) fn evaluate(path: &LocationPath, root: &NodeHandle) -> Vec<NodeHandle> {
    let index = TreeIndex::build(root);

    let mut context = vec![Rc::clone(root)];
    for step in &path.steps {
        let mut seen = HashSet::new();
        let mut next = Vec::new();
        for node in &context {
            for found in apply_step(node, step, &index) {
                if seen.insert(key(&found)) {
                    next.push(found);
                }
            }
        }
        next.sort_by_key(|node| index.order.get(&key(node)).copied().unwrap_or(usize::MAX));
        context = next;
        if context.is_empty() {
            break;
        }
    }

    context.retain(|node| node.borrow().is_element());
    context
}
