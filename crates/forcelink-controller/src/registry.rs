use crate::error::{ControllerError, ControllerResult};

/// Tally of live workers. The controller's event loop runs until the count
/// returns to zero after having been positive at least once.
#[derive(Clone, Copy, Debug, Default)]
pub struct Registry {
    registered: usize,
    seen_any: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self) {
        self.registered += 1;
        self.seen_any = true;
    }

    pub fn deregister(&mut self) -> ControllerResult<()> {
        if self.registered == 0 {
            return Err(ControllerError::Bookkeeping(
                "deregistration with no workers registered".into(),
            ));
        }
        self.registered -= 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.registered
    }

    pub fn finished(&self) -> bool {
        self.seen_any && self.registered == 0
    }
}
