//! Structural tree rewriting

use super::node::{Expression, Label, Statement};
use std::collections::HashMap;

/// Rebuilds statements bottom-up, giving implementors a hook at each node.
///
/// The default methods copy the tree unchanged; override the hooks for the
/// nodes you care about.
pub trait Rewriter {
    /// Maps a label reference
    fn rewrite_label(&mut self, label: Label) -> Label {
        label
    }

    /// Rebuilds an expression
    fn rewrite_expression(&mut self, expression: Expression) -> Expression {
        match expression {
            Expression::ReadMemory { address, size } => Expression::ReadMemory {
                address: Box::new(self.rewrite_expression(*address)),
                size,
            },
            Expression::Arithmetic { op, left, right } => Expression::Arithmetic {
                op,
                left: Box::new(self.rewrite_expression(*left)),
                right: Box::new(self.rewrite_expression(*right)),
            },
            Expression::Comparison { op, left, right } => Expression::Comparison {
                op,
                left: Box::new(self.rewrite_expression(*left)),
                right: Box::new(self.rewrite_expression(*right)),
            },
            Expression::Conversion {
                value,
                size,
                signed,
            } => Expression::Conversion {
                value: Box::new(self.rewrite_expression(*value)),
                size,
                signed,
            },
            Expression::Call { address, arguments } => Expression::Call {
                address: Box::new(self.rewrite_expression(*address)),
                arguments: arguments
                    .into_iter()
                    .map(|arg| self.rewrite_expression(arg))
                    .collect(),
            },
            Expression::CallWithArgCount { address, count } => Expression::CallWithArgCount {
                address: Box::new(self.rewrite_expression(*address)),
                count: Box::new(self.rewrite_expression(*count)),
            },
            Expression::Dispatch {
                function,
                arguments,
            } => Expression::Dispatch {
                function,
                arguments: arguments
                    .into_iter()
                    .map(|arg| self.rewrite_expression(arg))
                    .collect(),
            },
            leaf @ (Expression::Constant(_)
            | Expression::ReadLocal(_)
            | Expression::StackPop
            | Expression::GetMemorySize) => leaf,
        }
    }

    /// Rebuilds a statement
    fn rewrite_statement(&mut self, statement: Statement) -> Statement {
        match statement {
            Statement::Label(label) => Statement::Label(self.rewrite_label(label)),
            Statement::Jump(label) => Statement::Jump(self.rewrite_label(label)),
            Statement::Branch {
                condition,
                statement,
            } => Statement::Branch {
                condition: self.rewrite_expression(condition),
                statement: Box::new(self.rewrite_statement(*statement)),
            },
            Statement::Expression(e) => Statement::Expression(self.rewrite_expression(e)),
            Statement::WriteLocal { local, value } => Statement::WriteLocal {
                local,
                value: self.rewrite_expression(value),
            },
            Statement::WriteMemory {
                address,
                value,
                size,
            } => Statement::WriteMemory {
                address: self.rewrite_expression(address),
                value: self.rewrite_expression(value),
                size,
            },
            Statement::StackPush(e) => Statement::StackPush(self.rewrite_expression(e)),
            Statement::StackCopy(e) => Statement::StackCopy(self.rewrite_expression(e)),
            Statement::Return(e) => Statement::Return(self.rewrite_expression(e)),
            Statement::OutputChar(e) => Statement::OutputChar(self.rewrite_expression(e)),
            Statement::OutputNumber(e) => Statement::OutputNumber(self.rewrite_expression(e)),
            Statement::OutputString(e) => Statement::OutputString(self.rewrite_expression(e)),
            Statement::Quit => Statement::Quit,
            Statement::RestoreUndo => Statement::RestoreUndo,
        }
    }
}

/// Renames labels through an old-to-new index map
#[derive(Debug, Default)]
pub struct LabelRemap {
    map: HashMap<usize, usize>,
}

impl LabelRemap {
    /// Creates an empty remap
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `old` becomes `new`
    pub fn insert(&mut self, old: Label, new: Label) {
        self.map.insert(old.index(), new.index());
    }

    /// Number of recorded renames
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Rewriter for LabelRemap {
    fn rewrite_label(&mut self, label: Label) -> Label {
        // Unmapped labels are left alone; pruning guarantees every referenced label is mapped
        self.map.get(&label.index()).copied().map_or(label, Label)
    }
}
