//! Bound context frames.
//!
//! `with_attrs`/`with_group` push a [`Frame`] onto a handler's
//! [`FrameStack`]. The stack is a persistent list: pushing returns a new
//! stack that shares every earlier frame with its parent, so deriving a
//! handler never copies or mutates the parent's frames.

use std::sync::Arc;

use sqlog_core::Attr;

/// One bound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// A group label (non-empty).
    Group(String),
    /// Attributes rendered on every record (non-empty).
    Attrs(Vec<Attr>),
}

impl Frame {
    /// Whether this is a group label.
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

#[derive(Debug)]
struct Node {
    frame: Frame,
    parent: Option<Arc<Node>>,
}

impl Drop for Node {
    fn drop(&mut self) {
        // Unlink iteratively so a long chain does not recurse on drop.
        let mut next = self.parent.take();
        while let Some(node) = next {
            match Arc::try_unwrap(node) {
                Ok(mut owned) => next = owned.parent.take(),
                Err(_) => break,
            }
        }
    }
}

/// Immutable, structurally shared stack of frames.
#[derive(Clone, Debug, Default)]
pub struct FrameStack {
    head: Option<Arc<Node>>,
    len: usize,
}

impl FrameStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new stack with `frame` on top. `self` is left untouched.
    #[must_use]
    pub fn push(&self, frame: Frame) -> Self {
        Self {
            head: Some(Arc::new(Node {
                frame,
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no frame is bound.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Frames in binding order (oldest first).
    pub fn frames(&self) -> Vec<&Frame> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            out.push(&node.frame);
            cursor = node.parent.as_deref();
        }
        out.reverse();
        out
    }

    /// Frames to render for a record.
    ///
    /// A record without attributes drops the trailing group labels: a group
    /// that receives no content is not rendered at all.
    pub fn visible(&self, record_has_attrs: bool) -> Vec<&Frame> {
        let mut frames = self.frames();
        if !record_has_attrs {
            while frames.last().is_some_and(|f| f.is_group()) {
                let _ = frames.pop();
            }
        }
        frames
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str) -> Frame {
        Frame::Group(name.to_string())
    }

    fn attrs(key: &str) -> Frame {
        Frame::Attrs(vec![Attr::new(key, 1_i64)])
    }

    #[test]
    fn push_preserves_parent() {
        let base = FrameStack::new().push(attrs("a"));
        let derived = base.push(group("g"));
        assert_eq!(base.len(), 1);
        assert_eq!(derived.len(), 2);
        assert_eq!(base.frames(), vec![&attrs("a")]);
        assert_eq!(derived.frames(), vec![&attrs("a"), &group("g")]);
    }

    #[test]
    fn siblings_do_not_see_each_other() {
        let base = FrameStack::new().push(group("root"));
        let left = base.push(attrs("left"));
        let right = base.push(attrs("right"));
        assert_eq!(left.frames()[1], &attrs("left"));
        assert_eq!(right.frames()[1], &attrs("right"));
    }

    #[test]
    fn visible_drops_trailing_groups_without_record_attrs() {
        let stack = FrameStack::new()
            .push(group("outer"))
            .push(attrs("a"))
            .push(group("g1"))
            .push(group("g2"));
        assert_eq!(
            stack.visible(false),
            vec![&group("outer"), &attrs("a")]
        );
        assert_eq!(stack.visible(true).len(), 4);
    }

    #[test]
    fn visible_all_groups_without_attrs_is_empty() {
        let stack = FrameStack::new().push(group("a")).push(group("b"));
        assert!(stack.visible(false).is_empty());
    }

    #[test]
    fn long_chain_drops_without_overflow() {
        let mut stack = FrameStack::new();
        for i in 0..200_000 {
            stack = stack.push(Frame::Group(i.to_string()));
        }
        assert_eq!(stack.len(), 200_000);
        drop(stack);
    }
}
