use super::node::{Label, Local, Statement};

/// A finished function body.
///
/// Only [`BodyBuilder::into_body`](super::BodyBuilder::into_body) and
/// [`normalize`](super::normalize) produce bodies, so the following always hold:
/// the first statement is a [`Statement::Label`], every label is either a jump
/// target or directly follows a branch, and labels are numbered `0..N` in the
/// order their statements appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    statements: Vec<Statement>,
    labels: Vec<Label>,
    locals: Vec<Local>,
}

impl Body {
    pub(super) fn new(statements: Vec<Statement>, label_count: usize, locals: Vec<Local>) -> Self {
        Self {
            statements,
            labels: (0..label_count).map(Label).collect(),
            locals,
        }
    }

    /// Statements in program order
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Labels in statement order
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Declared locals in frame order
    pub fn locals(&self) -> &[Local] {
        &self.locals
    }

    /// Number of labels
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Consumes the body, returning its parts
    pub fn into_parts(self) -> (Vec<Statement>, Vec<Local>) {
        (self.statements, self.locals)
    }
}
