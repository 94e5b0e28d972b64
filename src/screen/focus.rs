//! Focus history and tab order.
//!
//! The history is a bounded stack: the top is the focused element, older
//! entries are what [`FocusHistory::pop`] and [`FocusHistory::rewind`] fall
//! back to. [`FocusHistory::clear`] enters a rest state with nothing
//! focused while keeping the entries. Every mutation returns a
//! [`FocusChange`] so the screen can fire blur/focus listeners in the right
//! order.

use crate::element::{ElementId, Tree};

/// Most entries the history keeps.
pub const HISTORY_LIMIT: usize = 10;

/// Who lost and who gained focus in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FocusChange {
    pub blurred: Option<ElementId>,
    pub focused: Option<ElementId>,
}

impl FocusChange {
    pub fn is_empty(&self) -> bool {
        self.blurred.is_none() && self.focused.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FocusHistory {
    stack: Vec<ElementId>,
    saved: Option<ElementId>,
    resting: bool,
}

impl FocusHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused(&self) -> Option<ElementId> {
        if self.resting {
            return None;
        }
        self.stack.last().copied()
    }

    /// Nothing is focused but the history is kept.
    pub fn is_resting(&self) -> bool {
        self.resting
    }

    pub fn entries(&self) -> &[ElementId] {
        &self.stack
    }

    /// Make `id` the focused element. The oldest entry falls off when full.
    pub fn push(&mut self, id: ElementId) -> FocusChange {
        let old = self.focused();
        if self.resting {
            self.resting = false;
            if self.stack.last() == Some(&id) {
                return FocusChange { blurred: None, focused: Some(id) };
            }
        }
        if self.stack.len() == HISTORY_LIMIT {
            self.stack.remove(0);
        }
        self.stack.push(id);
        FocusChange { blurred: old, focused: Some(id) }
    }

    /// Drop the focused element; the previous entry, if any, regains focus.
    pub fn pop(&mut self) -> FocusChange {
        if self.resting {
            return FocusChange::default();
        }
        let old = self.stack.pop();
        FocusChange { blurred: old, focused: self.focused() }
    }

    /// Like [`pop`](Self::pop), but skips entries `usable` rejects.
    pub fn rewind(&mut self, usable: impl Fn(ElementId) -> bool) -> FocusChange {
        if self.resting {
            return FocusChange::default();
        }
        let old = self.stack.pop();
        while let Some(id) = self.stack.pop() {
            if usable(id) {
                self.stack.push(id);
                return FocusChange { blurred: old, focused: Some(id) };
            }
        }
        FocusChange { blurred: old, focused: None }
    }

    /// Forget every occurrence of `id`. Returns a change when it was focused.
    pub fn remove(&mut self, id: ElementId) -> FocusChange {
        let was_focused = self.focused() == Some(id);
        self.stack.retain(|e| *e != id);
        if self.stack.is_empty() {
            self.resting = false;
        }
        if self.saved == Some(id) {
            self.saved = None;
        }
        if was_focused {
            FocusChange { blurred: Some(id), focused: self.focused() }
        } else {
            FocusChange::default()
        }
    }

    /// Unfocus without touching the entries.
    pub fn clear(&mut self) -> FocusChange {
        let Some(old) = self.focused() else {
            return FocusChange::default();
        };
        self.resting = true;
        FocusChange { blurred: Some(old), focused: None }
    }

    pub fn save(&mut self) {
        self.saved = self.focused();
    }

    /// Take the saved element, if any.
    pub fn take_saved(&mut self) -> Option<ElementId> {
        self.saved.take()
    }
}

/// Focusable, visible elements in tab order.
///
/// Positive tab indices come first in ascending order, then index 0 in
/// document order. Negative indices are reachable only programmatically.
pub fn tab_order(tree: &Tree) -> Vec<ElementId> {
    let mut order: Vec<(i32, ElementId)> = tree
        .walk()
        .into_iter()
        .filter(|id| tree.is_visible(*id))
        .filter_map(|id| {
            let el = tree.get(id)?;
            (el.focusable && el.tab_index >= 0).then_some((el.tab_index, id))
        })
        .collect();
    order.sort_by_key(|(index, _)| if *index > 0 { (0, *index) } else { (1, 0) });
    order.into_iter().map(|(_, id)| id).collect()
}

/// Target of moving focus by `offset` places through `order`.
///
/// With nothing focused (or the focused element outside the order),
/// `+n` lands on the n-th element and `-n` on the n-th from the end.
pub fn offset_target(order: &[ElementId], current: Option<ElementId>, offset: i32) -> Option<ElementId> {
    if order.is_empty() || offset == 0 {
        return None;
    }
    let len = order.len() as i64;
    let pos = match current.and_then(|c| order.iter().position(|e| *e == c)) {
        Some(i) => i as i64,
        None if offset > 0 => -1,
        None => len,
    };
    let i = (pos + offset as i64).rem_euclid(len);
    order.get(i as usize).copied()
}
