//! Display names for nodes, assigned lazily on first display.
//!
//! Names look like `Text_3`. The ordinal comes from a per-kind counter
//! that only ever increases during a document session, so a name is
//! never handed out twice even after its node is deleted.

use std::collections::HashMap;

use crate::node::{NodeId, NodeKindTag};

/// Registry of assigned display names, scoped to one document.
#[derive(Debug, Clone, Default)]
pub struct NamingRegistry {
    counters: HashMap<NodeKindTag, u32>,
    names: HashMap<NodeId, String>,
}

impl NamingRegistry {
    /// Empty registry with every counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of `id`, assigning the next ordinal for `kind` on first call.
    pub fn display_name(&mut self, id: NodeId, kind: NodeKindTag) -> &str {
        let counters = &mut self.counters;
        self.names.entry(id).or_insert_with(|| {
            let ordinal = counters.entry(kind).or_insert(0);
            *ordinal += 1;
            format!("{}_{}", kind.display_base(), ordinal)
        })
    }

    /// Previously assigned name, without assigning one.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Drop the name of a deleted node. The counter is not rewound.
    pub fn forget(&mut self, id: NodeId) {
        self.names.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_kind_ordinals() {
        let mut names = NamingRegistry::new();
        let t1 = NodeId::new();
        let t2 = NodeId::new();
        let c1 = NodeId::new();
        assert_eq!(names.display_name(t1, NodeKindTag::Text), "Text_1");
        assert_eq!(names.display_name(c1, NodeKindTag::Chart), "Radar_1");
        assert_eq!(names.display_name(t2, NodeKindTag::Text), "Text_2");
        // stable on repeat
        assert_eq!(names.display_name(t1, NodeKindTag::Text), "Text_1");
    }

    #[test]
    fn test_ordinals_not_reused_after_delete() {
        let mut names = NamingRegistry::new();
        let a = NodeId::new();
        names.display_name(a, NodeKindTag::Pattern);
        names.forget(a);
        assert!(names.get(a).is_none());
        let b = NodeId::new();
        assert_eq!(names.display_name(b, NodeKindTag::Pattern), "Pattern_2");
    }
}
