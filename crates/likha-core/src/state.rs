use std::sync::Arc;

use crate::model::{Mark, Node};
use crate::ops::Transaction;
use crate::resolve::ResolvedPos;
use crate::schema::Schema;
use crate::selection::Selection;
use crate::transform::{Transform, TransactionError, apply_steps};

/// A document, the selection inside it and the schema both conform to.
/// Applying a transaction yields a new state; the old one stays valid.
#[derive(Debug, Clone)]
pub struct EditorState {
    pub doc: Node,
    pub selection: Selection,
    pub schema: Arc<Schema>,
}

impl EditorState {
    /// State with the cursor at the start of `doc`.
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        let selection = Selection::at_start(&doc, &schema);
        Self {
            doc,
            selection,
            schema,
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection.validate(&self.doc, &self.schema);
        self
    }

    pub fn transform(&self) -> Transform<'_> {
        Transform::new(&self.schema, self.doc.clone())
    }

    /// Applies `tx` atomically. The selection is the transaction's
    /// `selection_after` when given, otherwise the current one mapped
    /// through the steps; either way it is re-validated.
    pub fn apply(&self, tx: &Transaction) -> Result<EditorState, TransactionError> {
        let applied = apply_steps(&self.doc, &self.schema, &tx.steps)?;
        let selection = match tx.selection_after {
            Some(selection) => selection.validate(&applied.doc, &self.schema),
            None => self
                .selection
                .map(&applied.mapping, &applied.doc, &self.schema),
        };
        Ok(EditorState {
            doc: applied.doc,
            selection,
            schema: Arc::clone(&self.schema),
        })
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, TransactionError> {
        ResolvedPos::resolve(&self.doc, pos)
    }

    /// Marks in effect at the selection: those at the cursor for an empty
    /// selection, otherwise those of the first inline node selected.
    pub fn selection_marks(&self) -> Vec<Mark> {
        let Ok(from) = self.resolve(self.selection.from()) else {
            return Vec::new();
        };
        if self.selection.is_empty() {
            return from.marks(&self.schema);
        }
        let mut marks = None;
        self.doc
            .nodes_between(self.selection.from(), self.selection.to(), |node, _, _, _| {
                if marks.is_none() && node.is_text() {
                    marks = Some(node.marks().to_vec());
                }
                marks.is_none()
            });
        marks.unwrap_or_default()
    }
}
