use crate::ops::OpKind;
use crate::types::DType;
use std::fmt;

/// Stable handle of a node inside its [`Graph`](super::Graph).
///
/// Handles are arena indices: they stay valid for the life of the graph
/// and are only meaningful for the graph that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Position of the node in the graph arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One vertex of the computation graph.
///
/// A node without an op is a leaf (an input or parameter) and receives its
/// value through `TapeMachine::let_value`. A node with an op is derived; its
/// value is computed from its inputs. Shape and dtype are fixed when the
/// node is created.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) op: Option<OpKind>,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) shape: Vec<usize>,
    pub(crate) dtype: DType,
    pub(crate) name: Option<String>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The op applied by a derived node, `None` for leaves.
    pub fn op(&self) -> Option<&OpKind> {
        self.op.as_ref()
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.op.is_none()
    }

    /// Name if the node has one, otherwise the op (or `leaf`) and the id.
    pub fn label(&self) -> String {
        match (&self.name, &self.op) {
            (Some(name), _) => name.clone(),
            (None, Some(op)) => format!("{}{}", op, self.id),
            (None, None) => format!("leaf{}", self.id),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.op {
            None => write!(f, "{} :: {}{:?}", self.label(), self.dtype, self.shape),
            Some(op) => {
                let args: Vec<String> = self.inputs.iter().map(|i| i.to_string()).collect();
                write!(
                    f,
                    "{} = {}({}) :: {}{:?}",
                    self.label(),
                    op,
                    args.join(", "),
                    self.dtype,
                    self.shape
                )
            }
        }
    }
}
