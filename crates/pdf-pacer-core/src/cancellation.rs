use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::error::{Error, Result};

/// Shared flag that tells an in-flight render to stop
///
/// Clones observe the same flag, so the controller keeps one copy and hands
/// another to the renderer.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Bail out of a render of `page` if the token has been cancelled
    pub fn check_cancelled(&self, page: usize, stage: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::RenderCancelled { page, stage });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancellationToken::new();
        let handed_out = token.clone();
        assert!(handed_out.check_cancelled(3, "load").is_ok());

        token.cancel();
        assert!(handed_out.is_cancelled());
        assert!(matches!(
            handed_out.check_cancelled(3, "text"),
            Err(Error::RenderCancelled { page: 3, stage: "text" })
        ));
    }
}
