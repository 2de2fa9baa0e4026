//! Incremental body construction

use super::body::Body;
use super::node::{Label, Local, Statement, ValueSize};
use super::rewrite::{LabelRemap, Rewriter};
use crate::{Error, Result};
use std::collections::HashSet;

/// Accumulates statements, locals and labels while a function is decoded.
///
/// Labels are handed out before their position is known (forward jumps) and
/// bound later with [`mark_label`](Self::mark_label). Every label must be bound
/// exactly once before [`into_body`](Self::into_body) succeeds.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    statements: Vec<Statement>,
    locals: Vec<Local>,
    marked: Vec<bool>,
}

impl BodyBuilder {
    /// Creates an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh, unbound label
    pub fn new_label(&mut self) -> Label {
        self.marked.push(false);
        Label(self.marked.len() - 1)
    }

    /// Binds `label` to the current position by appending a label statement
    pub fn mark_label(&mut self, label: Label) -> Result<()> {
        match self.marked.get_mut(label.index()) {
            None => Err(Error::ForeignLabel(label.index())),
            Some(true) => Err(Error::LabelAlreadyMarked(label.index())),
            Some(marked) => {
                *marked = true;
                self.statements.push(Statement::Label(label));
                Ok(())
            }
        }
    }

    /// True once `label` has been bound
    pub fn is_marked(&self, label: Label) -> bool {
        self.marked.get(label.index()).copied().unwrap_or(false)
    }

    /// Declares the next local slot
    pub fn declare_local(&mut self, size: ValueSize) -> Local {
        let local = Local {
            index: self.locals.len(),
            size,
        };
        self.locals.push(local);
        local
    }

    /// Appends a statement
    pub fn add_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Number of labels handed out so far
    pub fn label_count(&self) -> usize {
        self.marked.len()
    }

    /// Finishes the body, pruning and renumbering its labels
    pub fn into_body(self) -> Result<Body> {
        if let Some(unmarked) = self.marked.iter().position(|marked| !marked) {
            return Err(Error::UnmarkedLabel(unmarked));
        }

        Ok(normalize(self.statements, self.locals))
    }
}

/// Labels that must survive pruning: jump targets (direct or branch-guarded)
/// and labels that open the fall-through path after a branch
fn used_labels(statements: &[Statement]) -> HashSet<Label> {
    let mut used = HashSet::new();

    for (i, statement) in statements.iter().enumerate() {
        match statement {
            Statement::Jump(target) => {
                used.insert(*target);
            }
            Statement::Branch { statement, .. } => {
                if let Statement::Jump(target) = statement.as_ref() {
                    used.insert(*target);
                }
                if let Some(Statement::Label(next)) = statements.get(i + 1) {
                    used.insert(*next);
                }
            }
            _ => {}
        }
    }

    used
}

/// Prunes unused labels and renumbers the rest densely in statement order.
///
/// A leading label is synthesized when the first surviving statement is not a
/// label. Applying this to an already normalized statement list returns it
/// unchanged.
pub fn normalize(mut statements: Vec<Statement>, locals: Vec<Local>) -> Body {
    let used = used_labels(&statements);

    // Back to front so indices of unvisited statements stay valid
    for i in (0..statements.len()).rev() {
        if let Statement::Label(label) = statements[i] {
            if !used.contains(&label) {
                statements.remove(i);
            }
        }
    }

    let needs_leading_label = !matches!(statements.first(), Some(Statement::Label(_)));
    let mut next = usize::from(needs_leading_label);

    let mut remap = LabelRemap::new();
    for statement in &statements {
        if let Statement::Label(label) = statement {
            remap.insert(*label, Label(next));
            next += 1;
        }
    }

    let mut statements: Vec<Statement> = statements
        .into_iter()
        .map(|statement| remap.rewrite_statement(statement))
        .collect();

    if needs_leading_label {
        statements.insert(0, Statement::Label(Label(0)));
    }

    Body::new(statements, next, locals)
}
