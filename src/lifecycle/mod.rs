//! Process lifecycle: shared cancellation, listener launch, shutdown
//!
//! ```text
//! Coordinator::run
//!     Starting   -> create signal, ListenerSet::launch (one task per endpoint)
//!     Running    -> wait for signal (fatal listener error) or Ctrl-C
//!     Cancelling -> listeners stop accepting and drain
//!     Stopped    -> return the recorded reason
//! ```

pub mod coordinator;
pub mod listeners;
pub mod signal;


pub use coordinator::{Coordinator, LifecycleState};
pub use listeners::{ListenerHandle, ListenerSet};
pub use signal::CancellationSignal;
