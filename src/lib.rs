#![deny(
    missing_docs,
    missing_debug_implementations,
    unsafe_code,
    deprecated_in_future,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    rustdoc::invalid_codeblock_attributes
)]
#![doc(
    html_playground_url = "https://play.rust-lang.org/",
    test(attr(deny(warnings)))
)]

//! Unbounded blocking FIFO queue with first-come-first-served wakeups
//!
//! [`FairQueue`] hands values from any number of producers to any number of
//! consumers. Consumers that have to wait for data are served strictly in the
//! order they started waiting, regardless of the order in which the operating
//! system wakes them up:
//!
//! ```
//! use fairq::{FairQueue, TryTakeError};
//!
//! let queue = FairQueue::new();
//!
//! queue.put("a");
//! queue.put("b");
//!
//! assert_eq!(queue.take(), "a");
//! assert_eq!(queue.try_take(), Ok("b"));
//! assert_eq!(queue.try_take(), Err(TryTakeError::Empty));
//! assert_eq!(queue.visited(), 2);
//! ```

#[cfg(all(loom, shuttle))]
compile_error!("`--cfg loom` and `--cfg shuttle` cannot be enabled at the same time");

mod list;
pub mod sync;

pub use sync::{FairQueue, Timeout, TryTakeError};

mod stubs {
    //! Module that swaps the synchronization primitives for the model
    //! checked versions when building with `--cfg loom` or `--cfg shuttle`.

    #[cfg(loom)]
    pub use loom::sync::{
        atomic::{AtomicUsize, Ordering},
        Condvar, Mutex, MutexGuard,
    };

    #[cfg(all(loom, test))]
    pub use loom::{model, sync::Arc, thread};

    #[cfg(shuttle)]
    pub use shuttle::sync::{
        atomic::{AtomicUsize, Ordering},
        Condvar, Mutex, MutexGuard,
    };

    #[cfg(all(shuttle, test))]
    pub use shuttle::{sync::Arc, thread};

    #[cfg(not(any(loom, shuttle)))]
    pub use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Condvar, Mutex, MutexGuard,
    };

    #[cfg(all(not(any(loom, shuttle)), test))]
    pub use std::{sync::Arc, thread};

    /// Stub of `loom::model` that just runs the given closure, with no
    /// additional concurrent permutations
    #[cfg(all(not(any(loom, shuttle)), test))]
    pub fn model<F>(f: F)
    where
        F: Fn() + Sync + Send + 'static,
    {
        f()
    }
}
