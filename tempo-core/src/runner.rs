mod budget;
mod cancel;
mod concurrent;
mod count;
mod timed;

pub use budget::InvocationBudget;
pub use cancel::CancelToken;
pub use concurrent::ConcurrentRunner;
pub use count::CountRunner;
pub use timed::TimedRunner;

use crate::error::Result;

/// Drives invocations on the calling thread until its workload is done or it is cancelled.
pub trait InvocationRunner: Send {
    fn run(&mut self) -> Result<()>;

    /// Handle that stops this runner at its next loop boundary.
    fn cancel_token(&self) -> CancelToken;

    fn cancel(&self) {
        self.cancel_token().cancel();
    }
}
