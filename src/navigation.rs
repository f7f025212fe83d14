//! Navigation side effects that end the dashboard session.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

#[cfg_attr(test, mockall::automock)]
pub trait Navigator {
    /// Leave the dashboard for `path` (relative to the service root).
    fn redirect(&self, path: &str);
}

/// Remembers where the session was sent so the front end can wind down.
///
/// Clones share the recorded target.
#[derive(Debug, Clone, Default)]
pub struct SessionExit {
    target: Rc<RefCell<Option<String>>>,
}

impl SessionExit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<String> {
        self.target.borrow().clone()
    }

    pub fn has_exited(&self) -> bool {
        self.target.borrow().is_some()
    }
}

impl Navigator for SessionExit {
    fn redirect(&self, path: &str) {
        info!("Session ended, redirecting to {}", path);
        *self.target.borrow_mut() = Some(path.to_string());
    }
}
