//! Admission order for consumers that have to wait for an item

use std::{collections::BTreeSet, fmt};

/// Position of a waiting consumer in the admission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Ticket(u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ticket dispenser and "now serving" counter.
///
/// Waiters draw tickets in the order they enter the wait loop. Only the
/// holder of the current ticket may remove an item, and it passes the turn
/// on when it is done, either by taking an item or by giving up.
#[derive(Debug, Default)]
pub(crate) struct Tickets {
    next: u64,
    current: u64,
    waiters: usize,
    // Tickets whose holder gave up before being served. The current ticket
    // skips over them when it reaches them.
    abandoned: BTreeSet<u64>,
}

impl Tickets {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of consumers holding a ticket that was neither served nor
    /// abandoned.
    pub(crate) fn waiters(&self) -> usize {
        self.waiters
    }

    /// Hand out the next ticket and register its holder as a waiter.
    pub(crate) fn draw(&mut self) -> Ticket {
        let ticket = Ticket(self.next);
        self.next += 1;
        self.waiters += 1;
        ticket
    }

    pub(crate) fn is_turn(&self, ticket: Ticket) -> bool {
        self.current == ticket.0
    }

    /// The holder of the current ticket removed its item.
    pub(crate) fn complete(&mut self, ticket: Ticket) {
        debug_assert!(self.is_turn(ticket), "ticket {ticket} served out of turn");
        self.waiters -= 1;
        self.advance();
    }

    /// The holder of `ticket` stopped waiting without removing an item.
    ///
    /// Returns `true` if this moved the turn to another ticket, in which case
    /// the remaining waiters have to be woken to notice it.
    pub(crate) fn abandon(&mut self, ticket: Ticket) -> bool {
        debug_assert!(ticket.0 >= self.current && ticket.0 < self.next);
        self.waiters -= 1;

        if self.is_turn(ticket) {
            self.advance();
            true
        } else {
            self.abandoned.insert(ticket.0);
            false
        }
    }

    fn advance(&mut self) {
        self.current += 1;
        while self.abandoned.remove(&self.current) {
            self.current += 1;
        }

        if self.waiters == 0 {
            debug_assert_eq!(self.current, self.next);
            debug_assert!(self.abandoned.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickets_are_served_in_draw_order() {
        let mut tickets = Tickets::new();

        let first = tickets.draw();
        let second = tickets.draw();
        let third = tickets.draw();
        assert_eq!(tickets.waiters(), 3);

        assert!(tickets.is_turn(first));
        assert!(!tickets.is_turn(second));
        assert!(!tickets.is_turn(third));

        tickets.complete(first);
        assert!(tickets.is_turn(second));
        tickets.complete(second);
        assert!(tickets.is_turn(third));
        tickets.complete(third);

        assert_eq!(tickets.waiters(), 0);
        assert_eq!(tickets.current, tickets.next);
    }

    #[test]
    fn abandoning_the_current_ticket_passes_the_turn() {
        let mut tickets = Tickets::new();

        let first = tickets.draw();
        let second = tickets.draw();

        assert!(tickets.abandon(first));
        assert!(tickets.is_turn(second));
        assert_eq!(tickets.waiters(), 1);
    }

    #[test]
    fn abandoned_tickets_are_skipped_later() {
        let mut tickets = Tickets::new();

        let first = tickets.draw();
        let second = tickets.draw();
        let third = tickets.draw();
        let fourth = tickets.draw();

        // neither is current, so nobody needs to be woken yet
        assert!(!tickets.abandon(third));
        assert!(!tickets.abandon(second));
        assert!(tickets.is_turn(first));

        tickets.complete(first);
        assert!(tickets.is_turn(fourth));
        tickets.complete(fourth);

        assert_eq!(tickets.waiters(), 0);
        assert!(tickets.abandoned.is_empty());
    }

    #[test]
    fn new_tickets_continue_after_idle_periods() {
        let mut tickets = Tickets::new();

        let first = tickets.draw();
        tickets.complete(first);

        let second = tickets.draw();
        assert_eq!(second.to_string(), "#1");
        assert!(tickets.is_turn(second));
        assert!(tickets.abandon(second));

        let third = tickets.draw();
        assert!(tickets.is_turn(third));
    }
}
