use crate::ast::Body;
use crate::execution::Code;
use crate::flow::ControlFlowGraph;
use crate::Result;
use std::fmt;
use std::rc::Rc;

/// How arguments reach a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Arguments are pushed on the value stack, followed by their count
    StackArgument,
    /// Arguments are copied into the first locals
    LocalArgument,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::StackArgument => write!(f, "stack-argument"),
            FunctionKind::LocalArgument => write!(f, "local-argument"),
        }
    }
}

/// A decoded guest function with its control flow graph and executable code
#[derive(Debug, Clone)]
pub struct Function {
    kind: FunctionKind,
    address: u32,
    body: Body,
    graph: ControlFlowGraph,
    code: Rc<Code>,
}

impl Function {
    /// Wraps a finished body, computing its graph and code once
    pub fn new(kind: FunctionKind, address: u32, body: Body) -> Result<Self> {
        let graph = ControlFlowGraph::compute(&body)?;
        let code = Rc::new(Code::compile(&body, &graph)?);
        Ok(Self {
            kind,
            address,
            body,
            graph,
            code,
        })
    }

    /// Calling convention
    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    /// Address of the function's type byte
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Decoded body
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Basic blocks of the body
    pub fn graph(&self) -> &ControlFlowGraph {
        &self.graph
    }

    /// Postfix code run by the interpreter
    pub fn code(&self) -> &Rc<Code> {
        &self.code
    }
}
