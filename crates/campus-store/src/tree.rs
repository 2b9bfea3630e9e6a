//! In-memory arena over the replies of one query.
//!
//! Replies reference their parent by id only.  The arena indexes them by id
//! and keeps a children list per node, so walking a subtree is an explicit
//! graph traversal rather than a chase through owned pointers.

use std::collections::HashMap;

use campus_shared::ReplyId;

use crate::models::Reply;

#[derive(Debug, Default, Clone)]
pub struct ReplyArena {
    nodes: HashMap<ReplyId, Reply>,
    children: HashMap<ReplyId, Vec<ReplyId>>,
    roots: Vec<ReplyId>,
}

impl ReplyArena {
    /// Build an arena from replies in creation order.
    ///
    /// Sibling order follows input order.  A reply whose parent is not in
    /// the set is treated as a root.
    pub fn from_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        let replies: Vec<Reply> = replies.into_iter().collect();
        let mut arena = Self::default();

        for reply in &replies {
            arena.nodes.insert(reply.id, reply.clone());
        }

        for reply in replies {
            match reply.parent_id {
                Some(parent) if arena.nodes.contains_key(&parent) => {
                    arena.children.entry(parent).or_default().push(reply.id);
                }
                _ => arena.roots.push(reply.id),
            }
        }

        arena
    }

    pub fn get(&self, id: ReplyId) -> Option<&Reply> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: ReplyId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn roots(&self) -> &[ReplyId] {
        &self.roots
    }

    pub fn children(&self, id: ReplyId) -> &[ReplyId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `root` and every reply below it, in pre-order (parents before
    /// children).  Empty when `root` is not in the arena.
    pub fn descendants(&self, root: ReplyId) -> Vec<ReplyId> {
        if !self.contains(root) {
            return Vec::new();
        }

        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            // Reverse so the first child is visited first.
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Every reply in the arena, in pre-order across all roots.
    pub fn all_in_preorder(&self) -> Vec<ReplyId> {
        self.roots
            .iter()
            .flat_map(|root| self.descendants(*root))
            .collect()
    }
}
