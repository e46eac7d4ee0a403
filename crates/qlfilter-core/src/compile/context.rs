use crate::predicate::JoinId;
use std::collections::BTreeMap;

///
/// JoinContext
///
/// Immutable join-reuse policy threaded through one compilation.
///
/// Outside a disjunction no handle is ever shared, so every comparison on a
/// multi-valued relationship binds its own element. Entering an `Or` starts a
/// fresh shared context; siblings (and nested `And`s) then reuse the handle
/// the first of them bound for a relationship path.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct JoinContext {
    shared: bool,
    handles: BTreeMap<String, JoinId>,
}

impl JoinContext {
    /// Context for the top level and for conjunctions outside any `Or`.
    #[must_use]
    pub(crate) fn isolated() -> Self {
        Self::default()
    }

    /// Fresh context for the children of an `Or`.
    #[must_use]
    pub(crate) fn disjunction() -> Self {
        Self {
            shared: true,
            handles: BTreeMap::new(),
        }
    }

    #[must_use]
    pub(crate) fn handle(&self, path: &str) -> Option<JoinId> {
        if self.shared {
            self.handles.get(path).copied()
        } else {
            None
        }
    }

    /// Context after binding `id` to `path`; unchanged when not shared.
    #[must_use]
    pub(crate) fn with_handle(mut self, path: &str, id: JoinId) -> Self {
        if self.shared {
            self.handles.insert(path.to_string(), id);
        }
        self
    }
}
