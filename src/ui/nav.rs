//! Navigation stack of overlay screens shown over the catalog.

use tracing::warn;

use crate::actions::OperationGate;

/// Stack of screens; the top one is displayed and receives input.
///
/// While an install or remove holds the gate the stack is frozen, so the
/// screen that started the operation stays in place until it completes.
pub struct Navigator<S> {
    stack: Vec<S>,
    gate: OperationGate,
}

impl<S> Navigator<S> {
    pub fn new(gate: OperationGate) -> Self {
        Self {
            stack: Vec::new(),
            gate,
        }
    }

    fn frozen(&self, what: &str) -> bool {
        if self.gate.is_held() {
            warn!("ignoring {} while an operation is running", what);
            return true;
        }
        false
    }

    pub fn push(&mut self, screen: S) -> bool {
        if self.frozen("push") {
            return false;
        }
        self.stack.push(screen);
        true
    }

    pub fn pop(&mut self) -> bool {
        if self.frozen("pop") {
            return false;
        }
        self.stack.pop().is_some()
    }

    pub fn clear(&mut self) -> bool {
        if self.frozen("clear") {
            return false;
        }
        self.stack.clear();
        true
    }

    /// Drop every screen and show `screen` instead.
    pub fn replace(&mut self, screen: S) -> bool {
        self.clear() && self.push(screen)
    }

    pub fn top_mut(&mut self) -> Option<&mut S> {
        self.stack.last_mut()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
