//! Event listeners and the command queue they act through.
//!
//! Listeners never get `&mut Screen`; they push [`Command`]s that the screen
//! applies once the listener returns. This keeps dispatch re-entrancy free
//! and lets the screen compare focus and lock state before and after.

use crate::element::ElementId;
use crate::program::{Event, KeyEvent, MouseEvent};

/// Deferred action requested by a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Focus(ElementId),
    /// Rewind focus to the previous usable element.
    Blur,
    FocusNext,
    FocusPrevious,
    FocusPop,
    LockKeys(bool),
    Render,
}

#[derive(Debug, Default)]
pub struct Commands {
    queue: Vec<Command>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: Command) {
        self.queue.push(cmd);
    }

    pub fn focus(&mut self, id: ElementId) {
        self.push(Command::Focus(id));
    }

    pub fn blur(&mut self) {
        self.push(Command::Blur);
    }

    pub fn focus_next(&mut self) {
        self.push(Command::FocusNext);
    }

    pub fn focus_previous(&mut self) {
        self.push(Command::FocusPrevious);
    }

    pub fn focus_pop(&mut self) {
        self.push(Command::FocusPop);
    }

    pub fn lock_keys(&mut self, on: bool) {
        self.push(Command::LockKeys(on));
    }

    pub fn render(&mut self) {
        self.push(Command::Render);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, Command> {
        self.queue.drain(..)
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }

    pub(crate) fn append(&mut self, other: &mut Commands) {
        self.queue.append(&mut other.queue);
    }
}

/// Focus transition delivered to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    /// The element gained focus from `previous`.
    Focus { previous: Option<ElementId> },
    /// The element lost focus to `next`.
    Blur { next: Option<ElementId> },
}

pub type EventListener = Box<dyn FnMut(&Event, &mut Commands)>;
pub type KeyListener = Box<dyn FnMut(&KeyEvent, &mut Commands)>;
pub type MouseListener = Box<dyn FnMut(&MouseEvent, &mut Commands)>;
pub type FocusListener = Box<dyn FnMut(FocusEvent, &mut Commands)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_drain_in_order() {
        let mut c = Commands::new();
        c.focus_next();
        c.lock_keys(true);
        let mut other = Commands::new();
        other.render();
        c.append(&mut other);
        assert!(other.is_empty());
        let got: Vec<_> = c.drain().collect();
        assert_eq!(got, vec![Command::FocusNext, Command::LockKeys(true), Command::Render]);
        assert!(c.is_empty());
    }
}
