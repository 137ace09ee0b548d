//! Multi-producer multi-consumer blocking queue that serves waiting consumers
//! in the order they started waiting

use std::{
    fmt,
    sync::PoisonError,
    time::{Duration, Instant},
};

use crossbeam_utils::CachePadded;

use crate::{
    list::LinkedList,
    stubs::{AtomicUsize, Condvar, Mutex, MutexGuard, Ordering},
};

mod ticket;

use ticket::{Ticket, Tickets};

/// An unbounded FIFO queue that can be shared between any number of
/// producer and consumer threads.
///
/// Consumers either block in [`take`](Self::take) until an item is available,
/// or use [`try_take`](Self::try_take) to grab one without waiting. Consumers
/// that block are served strictly in the order they started waiting, the
/// wakeup order of the underlying condition variable does not matter.
///
/// The queue is shared by reference, for example from
/// [`std::thread::scope`], or by wrapping it in an [`Arc`](std::sync::Arc).
/// Because [`destroy`](Self::destroy) and `drop` need the queue by value,
/// it cannot be torn down while another thread is still blocked inside it.
pub struct FairQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
    // Number of items ever removed. Written with the lock held, read without it.
    visited: CachePadded<AtomicUsize>,
    // Mirror of `state.items.len()` for lock-free reads
    len: AtomicUsize,
}

struct State<T> {
    items: LinkedList<T>,
    tickets: Tickets,
}

impl<T> State<T> {
    /// A waiter may proceed once there is something to take and it holds the
    /// current ticket.
    fn is_ready(&self, ticket: Ticket) -> bool {
        !self.items.is_empty() && self.tickets.is_turn(ticket)
    }
}

impl<T> FairQueue<T> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty queue that can hold `capacity` pending items before it
    /// needs to allocate.
    ///
    /// The queue still grows past `capacity` when needed, this only sizes the
    /// initial allocation.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: LinkedList::with_capacity(capacity),
                tickets: Tickets::new(),
            }),
            available: Condvar::new(),
            visited: CachePadded::new(AtomicUsize::new(0)),
            len: AtomicUsize::new(0),
        }
    }

    /// Append an item to the back of the queue.
    ///
    /// If any consumer is blocked waiting for an item, all of them are woken
    /// up so the one whose turn it is can take it.
    pub fn put(&self, item: T) {
        let mut state = self.lock();

        state.items.push_back(item);
        self.len.store(state.items.len(), Ordering::Relaxed);

        if state.tickets.waiters() > 0 {
            self.available.notify_all();
        }
    }

    /// Remove the item at the front of the queue, blocking until one is
    /// available.
    ///
    /// When no other consumer is waiting and the queue holds an item, it is
    /// returned right away. Otherwise the caller joins the line of waiting
    /// consumers and is served after everyone who joined before it.
    pub fn take(&self) -> T {
        let mut state = self.lock();

        if state.tickets.waiters() == 0 {
            if let Some(item) = self.pop(&mut state) {
                return item;
            }
        }

        let ticket = state.tickets.draw();
        tracing::trace!(%ticket, waiters = state.tickets.waiters(), "waiting for an item");

        while !state.is_ready(ticket) {
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        self.serve(state, ticket)
    }

    /// Like [`take`](Self::take), but give up once `timeout` has elapsed
    /// without the caller being served.
    ///
    /// A consumer that gives up leaves the line without holding up anyone
    /// behind it. If the timeout expires at a moment where it is the caller's
    /// turn and an item is available, the item is returned instead.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T, Timeout> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();

        if state.tickets.waiters() == 0 {
            if let Some(item) = self.pop(&mut state) {
                return Ok(item);
            }
        }

        let ticket = state.tickets.draw();
        tracing::trace!(%ticket, ?timeout, "waiting for an item");

        while !state.is_ready(ticket) {
            let Some(deadline) = deadline else {
                // the deadline is too far out to represent, wait without one
                state = self
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                let turn_passed = state.tickets.abandon(ticket);
                tracing::debug!(%ticket, turn_passed, "gave up waiting for an item");

                if turn_passed && state.tickets.waiters() > 0 {
                    self.available.notify_all();
                }
                return Err(Timeout);
            }

            state = self
                .available
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        Ok(self.serve(state, ticket))
    }

    /// Remove the item at the front of the queue without blocking.
    ///
    /// This fails if the queue is empty, and also if a consumer is blocked in
    /// [`take`](Self::take): the front item belongs to that consumer.
    pub fn try_take(&self) -> Result<T, TryTakeError> {
        let mut state = self.lock();

        if state.items.is_empty() {
            return Err(TryTakeError::Empty);
        }
        if state.tickets.waiters() > 0 {
            return Err(TryTakeError::Reserved);
        }

        self.pop(&mut state).ok_or(TryTakeError::Empty)
    }

    /// Return the total number of items removed from the queue so far, by
    /// any of the `take` methods.
    ///
    /// This does not acquire the lock.
    pub fn visited(&self) -> usize {
        self.visited.load(Ordering::Acquire)
    }

    /// Return the number of items currently in the queue.
    ///
    /// This does not acquire the lock, so with concurrent producers or
    /// consumers the value may already be stale when it is returned.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Return true if the queue currently holds no items.
    ///
    /// See [`len`](Self::len) for caveats.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the number of consumers currently blocked waiting for an item.
    pub fn waiting(&self) -> usize {
        self.lock().tickets.waiters()
    }

    /// Tear down the queue, dropping every item still in it.
    ///
    /// Returns the number of items that were dropped. Dropping the queue has
    /// the same effect, this method just makes the leftovers visible.
    ///
    /// # Panics
    ///
    /// Panics if a consumer is still registered as waiting. Safe code can't
    /// reach that state, since waiting requires a borrow of the queue.
    pub fn destroy(self) -> usize {
        let mut state = self.lock();
        assert_eq!(
            state.tickets.waiters(),
            0,
            "queue destroyed while consumers were blocked in it"
        );

        let leftovers = state.items.drain().count();
        self.len.store(0, Ordering::Relaxed);
        drop(state);

        if leftovers > 0 {
            tracing::debug!(leftovers, "destroyed queue with pending items");
        }
        leftovers
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // Every mutation of the state completes before anything that could
        // panic, so a poisoned lock still guards consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop(&self, state: &mut State<T>) -> Option<T> {
        let item = state.items.pop_front()?;
        self.len.store(state.items.len(), Ordering::Relaxed);
        self.visited.fetch_add(1, Ordering::Release);
        Some(item)
    }

    /// Remove the front item for the holder of `ticket`, which must be ready.
    fn serve(&self, mut state: MutexGuard<'_, State<T>>, ticket: Ticket) -> T {
        let Some(item) = self.pop(&mut state) else {
            unreachable!("ticket {ticket} was ready on an empty queue");
        };
        state.tickets.complete(ticket);
        tracing::trace!(%ticket, "served waiting consumer");

        // There may be more items and another waiter whose turn it now is,
        // but whose wakeup was spent while this ticket was still current.
        if state.tickets.waiters() > 0 && !state.items.is_empty() {
            self.available.notify_all();
        }

        item
    }
}

impl<T> Default for FairQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FairQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FairQueue")
            .field("len", &self.len())
            .field("visited", &self.visited())
            .finish_non_exhaustive()
    }
}

impl<T> Drop for FairQueue<T> {
    fn drop(&mut self) {
        let mut state = self.lock();
        debug_assert_eq!(state.tickets.waiters(), 0);

        let leftovers = state.items.drain().count();
        if leftovers > 0 {
            tracing::debug!(leftovers, "dropped queue with pending items");
        }
    }
}

/// The result of a failed [`FairQueue::try_take`] call.
///
/// Neither case means something went wrong, the caller can retry later or
/// fall back to [`FairQueue::take`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TryTakeError {
    /// The queue had no items when attempting to take one.
    #[error("The queue was empty when attempting to take an item")]
    Empty,
    /// The queue had items, but a consumer blocked in `take` is entitled to
    /// the front one.
    #[error("The front item is reserved for a consumer blocked in `take`")]
    Reserved,
}

/// Error returned by [`FairQueue::take_timeout`] when no item was received
/// before the timeout elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Timed out waiting for an item")]
pub struct Timeout;
