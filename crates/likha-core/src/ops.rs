use serde::{Deserialize, Serialize};

use crate::model::{Attrs, Fragment, Mark};
use crate::selection::Selection;

/// A primitive edit. Positions refer to the document as left by the
/// previous steps of the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Replace `from..to` (both inside the same parent) with `content`.
    Replace {
        from: usize,
        to: usize,
        #[serde(default)]
        content: Fragment,
    },
    /// Replace the attributes, and optionally the type, of the node
    /// starting at `pos`.
    SetNodeMarkup {
        pos: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<String>,
        #[serde(default)]
        attrs: Attrs,
    },
    AddMark {
        from: usize,
        to: usize,
        mark: Mark,
    },
    /// Strip marks of one type, or every mark when `mark` is `None`.
    RemoveMark {
        from: usize,
        to: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mark: Option<String>,
    },
}

impl Step {
    pub fn replace(from: usize, to: usize, content: impl Into<Fragment>) -> Self {
        Step::Replace {
            from,
            to,
            content: content.into(),
        }
    }

    pub fn set_node_markup(pos: usize, kind: Option<&str>, attrs: Attrs) -> Self {
        Step::SetNodeMarkup {
            pos,
            kind: kind.map(str::to_string),
            attrs,
        }
    }

    pub fn add_mark(from: usize, to: usize, mark: Mark) -> Self {
        Step::AddMark { from, to, mark }
    }

    pub fn remove_mark(from: usize, to: usize, mark: Option<&str>) -> Self {
        Step::RemoveMark {
            from,
            to,
            mark: mark.map(str::to_string),
        }
    }

    /// How positions move across this step once applied.
    pub fn step_map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, content } => StepMap {
                ranges: vec![(*from, to - from, content.size())],
            },
            _ => StepMap::default(),
        }
    }
}

/// Replaced ranges of a step as `(start, old_size, new_size)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<(usize, usize, usize)>,
}

impl StepMap {
    /// Maps a position through the step. `assoc` picks the side a position
    /// sticks to when content is inserted right at it: negative keeps it
    /// before the insertion, positive moves it after.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let inserted = if side < 0 { 0 } else { new_size };
                return (start as isize + diff) as usize + inserted;
            }
            diff += new_size as isize - old_size as isize;
        }
        (pos as isize + diff).max(0) as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default = "default_add_to_history")]
    pub add_to_history: bool,
}

fn default_add_to_history() -> bool {
    true
}

impl Default for TransactionMeta {
    fn default() -> Self {
        Self {
            source: None,
            add_to_history: true,
        }
    }
}

/// An ordered batch of steps applied as one unit, plus where the
/// selection should land afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_after: Option<Selection>,
    #[serde(default)]
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            selection_after: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn selection_after(mut self, selection_after: Selection) -> Self {
        self.selection_after = Some(selection_after);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.meta.source = Some(source.into());
        self
    }

    pub fn without_history(mut self) -> Self {
        self.meta.add_to_history = false;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
