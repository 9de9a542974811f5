//! LIFO queue of configuration steps that need their target record to exist.

use crate::error::Result;

pub type DeferredAction<C> = Box<dyn FnOnce(&mut C) -> Result<()>>;

/// Actions run against a context `C`, newest first.
pub struct DeferredQueue<C> {
    actions: Vec<DeferredAction<C>>,
}

impl<C> Default for DeferredQueue<C> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
        }
    }
}

impl<C> std::fmt::Debug for DeferredQueue<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.actions.len())
            .finish()
    }
}

impl<C> DeferredQueue<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: impl FnOnce(&mut C) -> Result<()> + 'static) {
        self.actions.push(Box::new(action));
    }

    pub fn pop(&mut self) -> Option<DeferredAction<C>> {
        self.actions.pop()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Drop every action pushed after the queue had `len` entries.
    pub fn truncate(&mut self, len: usize) {
        self.actions.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        queue: DeferredQueue<Log>,
        order: Vec<&'static str>,
    }

    impl Log {
        fn drain(&mut self) -> Result<()> {
            while let Some(action) = self.queue.pop() {
                action(self)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_inner_actions_run_before_outer() {
        let mut log = Log::default();
        log.queue.push(|log: &mut Log| {
            log.order.push("outer");
            Ok(())
        });
        log.queue.push(|log: &mut Log| {
            log.order.push("inner");
            // Pushed while draining: runs before anything older.
            log.queue.push(|log: &mut Log| {
                log.order.push("nested");
                Ok(())
            });
            Ok(())
        });
        log.drain().unwrap();
        assert_eq!(log.order, vec!["inner", "nested", "outer"]);
        assert!(log.queue.is_empty());
    }

    #[test]
    fn test_truncate_keeps_older_actions() {
        let mut log = Log::default();
        log.queue.push(|log: &mut Log| {
            log.order.push("kept");
            Ok(())
        });
        let mark = log.queue.len();
        log.queue.push(|log: &mut Log| {
            log.order.push("dropped");
            Ok(())
        });
        log.queue.truncate(mark);
        log.drain().unwrap();
        assert_eq!(log.order, vec!["kept"]);
    }
}
