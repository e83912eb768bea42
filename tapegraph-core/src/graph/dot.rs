use super::Graph;
use std::fmt::Write;

impl Graph {
    /// Renders the graph in Graphviz dot format. Leaves are drawn as boxes,
    /// edges point from input to consumer and carry the input position.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph tapegraph {\n    rankdir=BT;\n");
        for node in &self.nodes {
            let shape = if node.is_leaf() { "box" } else { "ellipse" };
            // Writing into a String cannot fail.
            let _ = writeln!(
                out,
                "    n{} [shape={}, label=\"{}\\n{:?}\"];",
                node.id.index(),
                shape,
                node.label(),
                node.shape
            );
        }
        for node in &self.nodes {
            for (pos, input) in node.inputs.iter().enumerate() {
                let _ = writeln!(out, "    n{} -> n{} [label=\"{}\"];", input.index(), node.id.index(), pos);
            }
        }
        out.push_str("}\n");
        out
    }
}
