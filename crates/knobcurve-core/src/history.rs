use tracing::{debug, instrument, trace};

use crate::command::UndoCommand;

/// Linear undo history. Pushing applies the command, drops the redo tail and tries to merge into the top entry.
pub struct UndoStack {
    commands: Vec<Box<dyn UndoCommand>>,
    index: usize,
    clean_index: Option<usize>,
    limit: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(0)
    }
}

impl UndoStack {
    /// `limit == 0` keeps every entry.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            commands: Vec::new(),
            index: 0,
            clean_index: Some(0),
            limit,
        }
    }

    #[instrument(skip(self, command), fields(text = %command.text(), index = self.index))]
    pub fn push(&mut self, mut command: Box<dyn UndoCommand>) {
        command.redo();

        self.commands.truncate(self.index);
        if self.clean_index.is_some_and(|clean| clean > self.index) {
            self.clean_index = None;
        }

        let may_merge = self.clean_index != Some(self.index);
        if may_merge {
            if let Some(top) = self.commands.last_mut() {
                if top.merge_with(command.as_ref()) {
                    debug!(text = %top.text(), "merged into top entry");
                    return;
                }
            }
        }

        self.commands.push(command);
        self.index += 1;
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        if self.limit == 0 {
            return;
        }
        while self.commands.len() > self.limit {
            self.commands.remove(0);
            self.index = self.index.saturating_sub(1);
            self.clean_index = match self.clean_index {
                Some(0) | None => None,
                Some(clean) => Some(clean - 1),
            };
            trace!("oldest entry evicted");
        }
    }

    /// Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        let command = &mut self.commands[self.index];
        debug!(text = %command.text(), "undo");
        command.undo();
        true
    }

    /// Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(command) = self.commands.get_mut(self.index) else {
            return false;
        };
        debug!(text = %command.text(), "redo");
        command.redo();
        self.index += 1;
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index < self.commands.len()
    }

    #[must_use]
    pub fn undo_text(&self) -> Option<String> {
        self.index
            .checked_sub(1)
            .map(|index| self.commands[index].text())
    }

    #[must_use]
    pub fn redo_text(&self) -> Option<String> {
        self.commands.get(self.index).map(|command| command.text())
    }

    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.commands.iter().map(|command| command.text()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of applied entries.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.index = 0;
        self.clean_index = Some(0);
    }

    pub fn set_clean(&mut self) {
        self.clean_index = Some(self.index);
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.clean_index == Some(self.index)
    }

    /// Command at `index`, for inspection.
    #[must_use]
    pub fn command(&self, index: usize) -> Option<&dyn UndoCommand> {
        self.commands.get(index).map(|command| command.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use std::{any::Any, cell::RefCell, rc::Rc};

    use super::*;

    struct Counter {
        log: Rc<RefCell<i64>>,
        delta: i64,
        mergeable: bool,
    }

    impl UndoCommand for Counter {
        fn text(&self) -> String {
            format!("add {}", self.delta)
        }

        fn undo(&mut self) {
            *self.log.borrow_mut() -= self.delta;
        }

        fn redo(&mut self) {
            *self.log.borrow_mut() += self.delta;
        }

        fn merge_with(&mut self, other: &dyn UndoCommand) -> bool {
            match other.as_any().downcast_ref::<Self>() {
                Some(other) if self.mergeable && other.mergeable => {
                    self.delta += other.delta;
                    true
                }
                _ => false,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn counter(log: &Rc<RefCell<i64>>, delta: i64, mergeable: bool) -> Box<dyn UndoCommand> {
        Box::new(Counter {
            log: Rc::clone(log),
            delta,
            mergeable,
        })
    }

    #[test]
    fn push_truncates_redo_tail() {
        let log = Rc::new(RefCell::new(0));
        let mut stack = UndoStack::default();
        stack.push(counter(&log, 1, false));
        stack.push(counter(&log, 2, false));
        assert!(stack.undo());
        assert_eq!(*log.borrow(), 1);
        stack.push(counter(&log, 5, false));
        assert_eq!(stack.len(), 2);
        assert!(!stack.can_redo());
        assert_eq!(*log.borrow(), 6);
    }

    #[test]
    fn merge_skips_the_clean_entry() {
        let log = Rc::new(RefCell::new(0));
        let mut stack = UndoStack::default();
        stack.push(counter(&log, 1, true));
        stack.set_clean();
        stack.push(counter(&log, 1, true));
        assert_eq!(stack.len(), 2);
        stack.push(counter(&log, 1, true));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.undo_text().as_deref(), Some("add 2"));
        assert!(stack.undo());
        assert!(stack.is_clean());
        assert_eq!(*log.borrow(), 1);
    }

    #[test]
    fn limit_evicts_oldest() {
        let log = Rc::new(RefCell::new(0));
        let mut stack = UndoStack::new(2);
        for delta in 1..=3 {
            stack.push(counter(&log, delta, false));
        }
        assert_eq!(stack.texts(), vec!["add 2", "add 3"]);
        assert!(stack.undo());
        assert!(stack.undo());
        assert!(!stack.undo());
        assert_eq!(*log.borrow(), 1);
        assert!(!stack.is_clean());
    }
}
