//! Render batching and timer payloads.

/// Nested batch counter with a deferred render request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Batch {
    depth: u32,
    requested: bool,
}

impl Batch {
    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// Leave one level. True when this closed the outermost batch and a
    /// render was requested inside it.
    pub fn end(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        if self.depth == 0 && self.requested {
            self.requested = false;
            return true;
        }
        false
    }

    /// Ask for a render. True when it should run now, false when deferred.
    pub fn request(&mut self) -> bool {
        if self.depth > 0 {
            self.requested = true;
            return false;
        }
        true
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_active(&self) -> bool {
        self.depth > 0
    }
}

/// What a screen timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Render,
    CursorBlink,
}
