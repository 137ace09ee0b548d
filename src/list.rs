//! Singly-linked list of pending items, stored in an index arena
//!
//! Nodes live in a `Vec` of slots and refer to their successor by index.
//! Slots freed by [`LinkedList::pop_front`] are threaded onto a free list and
//! reused by later pushes, so the arena only grows to the largest number of
//! items that were ever pending at once.

use std::{fmt, iter::FusedIterator};

#[derive(Debug)]
enum Slot<T> {
    Occupied { value: T, next: Option<usize> },
    Vacant { next_free: Option<usize> },
}

/// A FIFO list of values. Not thread-safe on its own, the queue keeps it
/// behind its lock.
pub(crate) struct LinkedList<T> {
    slots: Vec<Slot<T>>,
    // Index of the oldest node, the next one `pop_front` returns
    head: Option<usize>,
    // Index of the newest node, its `next` is always `None`
    tail: Option<usize>,
    // Top of the stack of vacant slots
    free: Option<usize>,
    len: usize,
}

impl<T> LinkedList<T> {
    /// Create an empty list that can hold `capacity` items before the arena
    /// has to reallocate.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            head: None,
            tail: None,
            free: None,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Link a new node holding `value` after the current tail.
    pub(crate) fn push_back(&mut self, value: T) {
        let node = Slot::Occupied { value, next: None };
        let index = match self.free {
            Some(index) => {
                let Slot::Vacant { next_free } = &self.slots[index] else {
                    unreachable!("free list points at an occupied slot");
                };
                self.free = *next_free;
                self.slots[index] = node;
                index
            },
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            },
        };

        match self.tail {
            Some(tail) => match &mut self.slots[tail] {
                Slot::Occupied { next, .. } => *next = Some(index),
                Slot::Vacant { .. } => unreachable!("tail points at a vacant slot"),
            },
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;

        self.check_invariants();
    }

    /// Unlink the head node and hand its value back.
    pub(crate) fn pop_front(&mut self) -> Option<T> {
        let index = self.head?;
        let vacant = Slot::Vacant {
            next_free: self.free,
        };
        let Slot::Occupied { value, next } = std::mem::replace(&mut self.slots[index], vacant)
        else {
            unreachable!("head points at a vacant slot");
        };

        self.free = Some(index);
        self.head = next;
        self.len -= 1;

        if self.head.is_none() {
            self.tail = None;
            // Every slot is vacant now, so the free list can start over from
            // an empty arena. The allocation itself is kept for reuse.
            self.slots.clear();
            self.free = None;
        }

        self.check_invariants();
        Some(value)
    }

    /// Remove every item, oldest first.
    pub(crate) fn drain(&mut self) -> Drain<'_, T> {
        Drain { list: self }
    }

    /// Iterate over the pending items, oldest first.
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: &self.slots,
            cursor: self.head,
            remaining: self.len,
        }
    }

    fn check_invariants(&self) {
        debug_assert_eq!(self.head.is_none(), self.tail.is_none());
        debug_assert_eq!(self.head.is_none(), self.len == 0);
        debug_assert!(self.tail.map_or(true, |tail| matches!(
            self.slots[tail],
            Slot::Occupied { next: None, .. }
        )));
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Draining iterator returned by [`LinkedList::drain`].
///
/// Items that are not consumed are still removed when the iterator drops.
pub(crate) struct Drain<'l, T> {
    list: &'l mut LinkedList<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.list.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len(), Some(self.list.len()))
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

impl<T> FusedIterator for Drain<'_, T> {}

impl<T> Drop for Drain<'_, T> {
    fn drop(&mut self) {
        self.for_each(drop);
    }
}

/// Borrowing iterator returned by [`LinkedList::iter`].
pub(crate) struct Iter<'l, T> {
    slots: &'l [Slot<T>],
    cursor: Option<usize>,
    remaining: usize,
}

impl<'l, T> Iterator for Iter<'l, T> {
    type Item = &'l T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        match &self.slots[index] {
            Slot::Occupied { value, next } => {
                self.cursor = *next;
                self.remaining -= 1;
                Some(value)
            },
            Slot::Vacant { .. } => unreachable!("linked node points at a vacant slot"),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    #[test]
    fn push_and_pop_keep_insertion_order() {
        let mut list = LinkedList::with_capacity(4);
        assert!(list.is_empty());
        assert_eq!(list.pop_front(), None);

        for value in 0..10 {
            list.push_back(value);
        }
        assert_eq!(list.len(), 10);
        assert_eq!(format!("{list:?}"), "[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]");

        for expected in 0..10 {
            assert_eq!(list.pop_front(), Some(expected));
        }

        assert!(list.is_empty());
        assert_eq!(list.pop_front(), None);
    }

    #[test]
    fn vacant_slots_are_reused() {
        let mut list = LinkedList::with_capacity(0);

        list.push_back('a');
        list.push_back('b');
        list.push_back('c');
        assert_eq!(list.pop_front(), Some('a'));
        assert_eq!(list.pop_front(), Some('b'));

        // 'a' and 'b' left two vacant slots behind, both get reused
        list.push_back('d');
        list.push_back('e');
        assert_eq!(list.slots.len(), 3);
        assert_eq!(list.iter().copied().collect::<String>(), "cde");

        // pushing past the vacant slots grows the arena
        list.push_back('f');
        assert_eq!(list.slots.len(), 4);
        assert_eq!(list.iter().len(), 4);
    }

    #[test]
    fn emptying_the_list_resets_the_arena() {
        let mut list = LinkedList::with_capacity(0);

        for value in 0..8 {
            list.push_back(value);
        }
        let capacity = list.slots.capacity();
        while list.pop_front().is_some() {}

        assert!(list.slots.is_empty());
        assert_eq!(list.free, None);
        assert_eq!((list.head, list.tail), (None, None));
        assert_eq!(list.slots.capacity(), capacity);

        list.push_back(100);
        assert_eq!(list.head, Some(0));
        assert_eq!(list.tail, Some(0));
    }

    #[test]
    fn interleaved_operations() {
        let mut list = LinkedList::with_capacity(2);
        let mut expected = std::collections::VecDeque::new();

        for round in 0..50usize {
            for value in 0..(round % 4) {
                list.push_back((round, value));
                expected.push_back((round, value));
            }
            for _ in 0..(round % 3) {
                assert_eq!(list.pop_front(), expected.pop_front());
            }
            assert_eq!(list.len(), expected.len());
            assert!(list.iter().eq(expected.iter()));
        }
    }

    #[test]
    fn drain_drops_unconsumed_items() {
        #[derive(Debug)]
        struct DropCounter(Rc<RefCell<usize>>);

        impl Drop for DropCounter {
            fn drop(&mut self) {
                *self.0.borrow_mut() += 1;
            }
        }

        let counter = Rc::new(RefCell::new(0));
        let mut list = LinkedList::with_capacity(0);
        for _ in 0..5 {
            list.push_back(DropCounter(Rc::clone(&counter)));
        }

        let mut drain = list.drain();
        assert_eq!(drain.len(), 5);
        drop(drain.next());
        assert_eq!(*counter.borrow(), 1);
        drop(drain);

        assert_eq!(*counter.borrow(), 5);
        assert!(list.is_empty());
    }
}
