//! Step methods shared by rooted and anonymous traversals.
//!
//! Every method records one bytecode instruction; nothing is checked until
//! the traversal is assembled. Modulators (`as_`, `by*`, `times`, `until`,
//! `emit*`) attach to the step recorded just before them.

use trellis_bytecode::{Argument, Bytecode, Order, P, Scope, T, Token};
use trellis_core::{Operator, Value};

use crate::anonymous::AnonymousTraversal;

pub(crate) fn text(items: &[&str]) -> Vec<Argument> {
    items
        .iter()
        .map(|item| Argument::Value(Value::from(*item)))
        .collect()
}

fn value(v: impl Into<Value>) -> Argument {
    Argument::Value(v.into())
}

fn number(n: u64) -> Argument {
    Argument::Value(Value::Int(i64::try_from(n).unwrap_or(i64::MAX)))
}

fn child(traversal: AnonymousTraversal) -> Argument {
    Argument::Bytecode(traversal.into_bytecode())
}

fn children(traversals: impl IntoIterator<Item = AnonymousTraversal>) -> Vec<Argument> {
    traversals.into_iter().map(child).collect()
}

fn token(token: impl Into<Token>) -> Argument {
    Argument::Token(token.into())
}

pub trait Steps: Sized {
    /// Instructions recorded so far.
    fn bytecode(&self) -> &Bytecode;

    #[doc(hidden)]
    fn bytecode_mut(&mut self) -> &mut Bytecode;

    /// Record a step instruction by operator name.
    fn step(mut self, operator: &str, arguments: Vec<Argument>) -> Self {
        self.bytecode_mut().add_step(operator, arguments);
        self
    }

    fn out(self, labels: &[&str]) -> Self {
        self.step("out", text(labels))
    }

    fn in_(self, labels: &[&str]) -> Self {
        self.step("in", text(labels))
    }

    fn both(self, labels: &[&str]) -> Self {
        self.step("both", text(labels))
    }

    fn out_e(self, labels: &[&str]) -> Self {
        self.step("outE", text(labels))
    }

    fn in_e(self, labels: &[&str]) -> Self {
        self.step("inE", text(labels))
    }

    fn both_e(self, labels: &[&str]) -> Self {
        self.step("bothE", text(labels))
    }

    fn out_v(self) -> Self {
        self.step("outV", Vec::new())
    }

    fn in_v(self) -> Self {
        self.step("inV", Vec::new())
    }

    fn both_v(self) -> Self {
        self.step("bothV", Vec::new())
    }

    /// The endpoint of an edge that the traverser did not come from.
    fn other_v(self) -> Self {
        self.step("otherV", Vec::new())
    }

    fn values(self, keys: &[&str]) -> Self {
        self.step("values", text(keys))
    }

    fn value_map(self, keys: &[&str]) -> Self {
        self.step("valueMap", text(keys))
    }

    fn id(self) -> Self {
        self.step("id", Vec::new())
    }

    fn label(self) -> Self {
        self.step("label", Vec::new())
    }

    fn identity(self) -> Self {
        self.step("identity", Vec::new())
    }

    fn unfold(self) -> Self {
        self.step("unfold", Vec::new())
    }

    fn path(self) -> Self {
        self.step("path", Vec::new())
    }

    fn loops(self) -> Self {
        self.step("loops", Vec::new())
    }

    fn constant(self, v: impl Into<Value>) -> Self {
        self.step("constant", vec![value(v)])
    }

    /// Values bound to `labels` on the path, or side-effects of that name.
    fn select(self, labels: &[&str]) -> Self {
        self.step("select", text(labels))
    }

    /// Replace the object with the traverser's sack.
    fn sack(self) -> Self {
        self.step("sack", Vec::new())
    }

    /// Fold a projection into the sack: `sack_with(Operator::Mult).by_key("factor")`.
    fn sack_with(self, operator: Operator) -> Self {
        self.step("sack", vec![token(operator)])
    }

    fn map(self, traversal: AnonymousTraversal) -> Self {
        self.step("map", vec![child(traversal)])
    }

    fn flat_map(self, traversal: AnonymousTraversal) -> Self {
        self.step("flatMap", vec![child(traversal)])
    }

    fn count(self) -> Self {
        self.step("count", Vec::new())
    }

    /// Size of each traverser's collection instead of a global count.
    fn count_local(self) -> Self {
        self.step("count", vec![token(Scope::Local)])
    }

    fn project(self, keys: &[&str]) -> Self {
        self.step("project", text(keys))
    }

    /// Elements that have a property `key`.
    fn has_key(self, key: &str) -> Self {
        self.step("has", text(&[key]))
    }

    fn has(self, key: &str, predicate: P) -> Self {
        self.step("has", vec![value(key), predicate.into()])
    }

    fn has_value(self, key: &str, v: impl Into<Value>) -> Self {
        self.step("has", vec![value(key), value(v)])
    }

    fn has_labeled(self, label: &str, key: &str, predicate: P) -> Self {
        self.step("has", vec![value(label), value(key), predicate.into()])
    }

    fn has_label(self, labels: &[&str]) -> Self {
        self.step("hasLabel", text(labels))
    }

    fn has_id<I>(self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.step(
            "hasId",
            ids.into_iter().map(|id| Argument::Value(id.into())).collect(),
        )
    }

    fn has_not(self, key: &str) -> Self {
        self.step("hasNot", text(&[key]))
    }

    fn is(self, predicate: P) -> Self {
        self.step("is", vec![predicate.into()])
    }

    /// Keep traversers for which `traversal` yields something.
    fn where_(self, traversal: AnonymousTraversal) -> Self {
        self.step("where", vec![child(traversal)])
    }

    /// Compare the object against path labels: `where_p(P::neq("a"))`.
    fn where_p(self, predicate: P) -> Self {
        self.step("where", vec![predicate.into()])
    }

    /// Compare the value bound to `start` against path labels.
    fn where_label(self, start: &str, predicate: P) -> Self {
        self.step("where", vec![value(start), predicate.into()])
    }

    fn filter(self, traversal: AnonymousTraversal) -> Self {
        self.step("filter", vec![child(traversal)])
    }

    fn not(self, traversal: AnonymousTraversal) -> Self {
        self.step("not", vec![child(traversal)])
    }

    fn and(self, traversals: impl IntoIterator<Item = AnonymousTraversal>) -> Self {
        self.step("and", children(traversals))
    }

    fn or(self, traversals: impl IntoIterator<Item = AnonymousTraversal>) -> Self {
        self.step("or", children(traversals))
    }

    fn simple_path(self) -> Self {
        self.step("simplePath", Vec::new())
    }

    fn dedup(self) -> Self {
        self.step("dedup", Vec::new())
    }

    fn limit(self, n: u64) -> Self {
        self.step("limit", vec![number(n)])
    }

    fn skip(self, n: u64) -> Self {
        self.step("skip", vec![number(n)])
    }

    /// Traversers `low..high` in arrival order; `None` leaves the range open.
    fn range(self, low: u64, high: Option<u64>) -> Self {
        let high = match high {
            Some(high) => number(high),
            None => Argument::Value(Value::Int(-1)),
        };
        self.step("range", vec![number(low), high])
    }

    fn property(self, key: &str, v: impl Into<Value>) -> Self {
        self.step("property", vec![value(key), value(v)])
    }

    /// Set `key` to the first result of `traversal`.
    fn property_by(self, key: &str, traversal: AnonymousTraversal) -> Self {
        self.step("property", vec![value(key), child(traversal)])
    }

    fn store(self, key: &str) -> Self {
        self.step("store", text(&[key]))
    }

    fn side_effect(self, traversal: AnonymousTraversal) -> Self {
        self.step("sideEffect", vec![child(traversal)])
    }

    fn sum(self) -> Self {
        self.step("sum", Vec::new())
    }

    fn min(self) -> Self {
        self.step("min", Vec::new())
    }

    fn max(self) -> Self {
        self.step("max", Vec::new())
    }

    fn mean(self) -> Self {
        self.step("mean", Vec::new())
    }

    fn fold(self) -> Self {
        self.step("fold", Vec::new())
    }

    fn order(self) -> Self {
        self.step("order", Vec::new())
    }

    fn group_count(self) -> Self {
        self.step("groupCount", Vec::new())
    }

    fn aggregate(self, key: &str) -> Self {
        self.step("aggregate", text(&[key]))
    }

    fn barrier(self) -> Self {
        self.step("barrier", Vec::new())
    }

    /// A bulking barrier that releases after `max_size` traversers.
    fn barrier_max(self, max_size: u64) -> Self {
        self.step("barrier", vec![number(max_size)])
    }

    fn union(self, traversals: impl IntoIterator<Item = AnonymousTraversal>) -> Self {
        self.step("union", children(traversals))
    }

    /// Loop `body`; configure with `times`, `until` and `emit*` afterwards.
    fn repeat(self, body: AnonymousTraversal) -> Self {
        self.step("repeat", vec![child(body)])
    }

    fn choose(
        self,
        condition: AnonymousTraversal,
        on_true: AnonymousTraversal,
        on_false: AnonymousTraversal,
    ) -> Self {
        self.step(
            "choose",
            vec![child(condition), child(on_true), child(on_false)],
        )
    }

    fn coalesce(self, traversals: impl IntoIterator<Item = AnonymousTraversal>) -> Self {
        self.step("coalesce", children(traversals))
    }

    fn optional(self, traversal: AnonymousTraversal) -> Self {
        self.step("optional", vec![child(traversal)])
    }

    fn local(self, traversal: AnonymousTraversal) -> Self {
        self.step("local", vec![child(traversal)])
    }

    /// Bind the previous step's output to `label` on the path.
    fn as_(self, label: &str) -> Self {
        self.step("as", text(&[label]))
    }

    fn by(self) -> Self {
        self.step("by", Vec::new())
    }

    fn by_key(self, key: &str) -> Self {
        self.step("by", text(&[key]))
    }

    fn by_t(self, t: T) -> Self {
        self.step("by", vec![token(t)])
    }

    fn by_traversal(self, traversal: AnonymousTraversal) -> Self {
        self.step("by", vec![child(traversal)])
    }

    fn by_order(self, order: Order) -> Self {
        self.step("by", vec![token(order)])
    }

    fn by_key_order(self, key: &str, order: Order) -> Self {
        self.step("by", vec![value(key), token(order)])
    }

    fn by_traversal_order(self, traversal: AnonymousTraversal, order: Order) -> Self {
        self.step("by", vec![child(traversal), token(order)])
    }

    fn times(self, n: u32) -> Self {
        self.step("times", vec![value(i64::from(n))])
    }

    fn until(self, condition: AnonymousTraversal) -> Self {
        self.step("until", vec![child(condition)])
    }

    fn emit(self) -> Self {
        self.step("emit", Vec::new())
    }

    fn emit_if(self, condition: AnonymousTraversal) -> Self {
        self.step("emit", vec![child(condition)])
    }
}
