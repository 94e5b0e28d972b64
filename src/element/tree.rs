//! Element arena.
//!
//! Slots are never reused, so a stale [`ElementId`] resolves to `None`
//! rather than to a different element. The screen is the implicit root:
//! elements appended with no parent are its children.

use super::{Element, ElementId};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Option<Element>>,
    roots: Vec<ElementId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an element without attaching it.
    pub fn insert(&mut self, mut el: Element) -> ElementId {
        el.parent = None;
        el.children.clear();
        el.attached = false;
        el.lpos = None;
        el.index = None;
        let id = ElementId(self.nodes.len());
        self.nodes.push(Some(el));
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Children of the screen, in paint order.
    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    pub fn children(&self, parent: Option<ElementId>) -> &[ElementId] {
        match parent {
            None => &self.roots,
            Some(p) => self.get(p).map(|e| e.children.as_slice()).unwrap_or(&[]),
        }
    }

    /// Move `child` to the end of `parent`'s children (`None` = screen).
    pub fn append(&mut self, parent: Option<ElementId>, child: ElementId) -> Result<()> {
        if !self.contains(child) {
            return Err(Error::UnknownElement(child));
        }
        let attached = match parent {
            None => true,
            Some(p) => {
                let pe = self.get(p).ok_or(Error::UnknownElement(p))?;
                if p == child || self.is_ancestor(child, p) {
                    return Err(Error::UnknownElement(p));
                }
                pe.attached
            }
        };
        self.detach(child);
        match parent {
            None => self.roots.push(child),
            Some(p) => {
                if let Some(pe) = self.get_mut(p) {
                    pe.children.push(child);
                }
            }
        }
        if let Some(ce) = self.get_mut(child) {
            ce.parent = parent;
        }
        self.set_attached(child, attached);
        Ok(())
    }

    /// Unlink `id` from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, id: ElementId) {
        let Some(el) = self.get(id) else { return };
        let parent = el.parent;
        let linked = match parent {
            None => self.roots.contains(&id),
            Some(_) => true,
        };
        if !linked {
            return;
        }
        match parent {
            None => self.roots.retain(|c| *c != id),
            Some(p) => {
                if let Some(pe) = self.get_mut(p) {
                    pe.children.retain(|c| *c != id);
                }
            }
        }
        if let Some(el) = self.get_mut(id) {
            el.parent = None;
        }
        self.set_attached(id, false);
    }

    /// Delete `id` and its subtree. Returns every removed id, root first.
    pub fn remove(&mut self, id: ElementId) -> Vec<ElementId> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.detach(id);
        let removed = self.subtree(id);
        for r in &removed {
            if let Some(slot) = self.nodes.get_mut(r.0) {
                *slot = None;
            }
        }
        removed
    }

    /// `id` and its descendants in document order.
    pub fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(el) = self.get(cur) else { continue };
            out.push(cur);
            stack.extend(el.children.iter().rev().copied());
        }
        out
    }

    /// Every attached element in document order.
    pub fn walk(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        for root in &self.roots {
            out.extend(self.subtree(*root));
        }
        out
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut cur = self.get(id).and_then(|e| e.parent);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.get(p).and_then(|e| e.parent);
        }
        false
    }

    /// Attached and neither it nor any ancestor hidden.
    pub fn is_visible(&self, id: ElementId) -> bool {
        let Some(el) = self.get(id) else { return false };
        if !el.attached {
            return false;
        }
        let mut cur = Some(el);
        while let Some(e) = cur {
            if e.hidden {
                return false;
            }
            cur = e.parent.and_then(|p| self.get(p));
        }
        true
    }

    /// Nearest scrollable strict ancestor.
    pub fn scrollable_ancestor(&self, id: ElementId) -> Option<ElementId> {
        let mut cur = self.get(id).and_then(|e| e.parent);
        while let Some(p) = cur {
            let pe = self.get(p)?;
            if pe.scroll.is_some() {
                return Some(p);
            }
            cur = pe.parent;
        }
        None
    }

    /// Drop last-frame positions and z-indices.
    pub(crate) fn clear_frame(&mut self) {
        for el in self.nodes.iter_mut().flatten() {
            el.lpos = None;
            el.index = None;
        }
    }

    fn set_attached(&mut self, id: ElementId, attached: bool) {
        for d in self.subtree(id) {
            if let Some(e) = self.get_mut(d) {
                e.attached = attached;
                if !attached {
                    e.lpos = None;
                    e.index = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree3() -> (Tree, ElementId, ElementId, ElementId) {
        let mut t = Tree::new();
        let a = t.insert(Element::new());
        let b = t.insert(Element::new());
        let c = t.insert(Element::new());
        t.append(None, a).unwrap();
        t.append(Some(a), b).unwrap();
        t.append(None, c).unwrap();
        (t, a, b, c)
    }

    #[test]
    fn walk_is_document_order() {
        let (t, a, b, c) = tree3();
        assert_eq!(t.walk(), vec![a, b, c]);
        assert!(t.get(b).unwrap().is_attached());
    }

    #[test]
    fn reparenting_moves_the_subtree() {
        let (mut t, a, b, c) = tree3();
        t.append(Some(c), a).unwrap();
        assert_eq!(t.roots(), &[c]);
        assert_eq!(t.walk(), vec![c, a, b]);
        assert!(t.is_ancestor(c, b));
    }

    #[test]
    fn cycles_are_rejected() {
        let (mut t, a, b, _) = tree3();
        assert!(t.append(Some(b), a).is_err());
        assert!(t.append(Some(a), a).is_err());
    }

    #[test]
    fn detach_clears_attachment_recursively() {
        let (mut t, a, b, _) = tree3();
        t.detach(a);
        assert!(!t.get(a).unwrap().is_attached());
        assert!(!t.get(b).unwrap().is_attached());
        assert!(!t.is_visible(b));
    }

    #[test]
    fn remove_frees_subtree() {
        let (mut t, a, b, c) = tree3();
        assert_eq!(t.remove(a), vec![a, b]);
        assert!(!t.contains(b));
        assert_eq!(t.walk(), vec![c]);
        assert!(t.remove(a).is_empty());
    }

    #[test]
    fn hidden_ancestor_hides_descendants() {
        let (mut t, a, b, _) = tree3();
        t.get_mut(a).unwrap().hidden = true;
        assert!(!t.is_visible(b));
    }
}
