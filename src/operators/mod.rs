//! Pull-iterator operator tree. Each operator is an ordinary
//! `Iterator<Item = Row>` adapter — `Scan` borrows its reader directly
//! (operators borrow, don't own, readers), and every
//! operator above it wraps the previous stage generically the way
//! `std::iter` adapters do. `HashJoin` is the one operator that takes two
//! children; modeling it as a free function over two iterators (rather than
//! bolting a second child onto a one-child trait) is this engine's answer to
//! an explicit two-input operator rather than a one-child-plus-field hack.
//!
//! `ExplainNode` is built in lock-step with the iterator chain by
//! `executor::pull` so `explain()` can render the tree independently of
//! actually pulling rows.

pub mod aggregate;
pub mod filter;
pub mod group_by;
pub mod join;
pub mod limit;
pub mod order_by;
pub mod project;
pub mod scan;

/// One node of an explain-plan tree: an operator label plus its children
/// (zero for a leaf scan, one for most operators, two for a join).
#[derive(Debug, Clone)]
pub struct ExplainNode {
    pub label: String,
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self { label: label.into(), children: Vec::new() }
    }

    pub fn wrap(label: impl Into<String>, child: ExplainNode) -> Self {
        Self { label: label.into(), children: vec![child] }
    }

    pub fn join(label: impl Into<String>, left: ExplainNode, right: ExplainNode) -> Self {
        Self { label: label.into(), children: vec![left, right] }
    }

    /// Render the tree as one line per operator, each child indented two
    /// spaces deeper than its parent.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out.trim_end().to_string()
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.label);
        out.push('\n');
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_indented_tree() {
        let scan = ExplainNode::leaf("Scan(data)");
        let filter = ExplainNode::wrap("Filter(1 condition(s))", scan);
        let limit = ExplainNode::wrap("Limit(2)", filter);
        assert_eq!(limit.render(), "Limit(2)\n  Filter(1 condition(s))\n    Scan(data)");
    }

    #[test]
    fn renders_join_with_two_children() {
        let left = ExplainNode::leaf("Scan(c)");
        let right = ExplainNode::leaf("Scan(o)");
        let join = ExplainNode::join("HashJoin(Left, id = customer_id)", left, right);
        let rendered = join.render();
        assert!(rendered.starts_with("HashJoin"));
        assert_eq!(rendered.lines().count(), 3);
    }
}
