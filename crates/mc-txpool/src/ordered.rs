//! The per-slot ordering queue.
//!
//! A heap over *senders*, keyed by the gas price of each sender's
//! lowest-nonce pending transaction. The head of the queue is always
//! the best-priced transaction whose sender nonce progression allows it
//! next.
//!
//! Total order: gas price descending, then sender name ascending, then
//! nonce ascending. The name tie-break makes block contents
//! deterministic for a given pending snapshot.

use primitive_types::U256;
use shared_types::{Name, Transaction};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap, VecDeque};

/// Heap entry: one sender keyed by its head transaction's price.
#[derive(Debug, PartialEq, Eq)]
struct SenderHead {
    price: U256,
    name: Name,
}

impl Ord for SenderHead {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher price wins; equal prices fall back to the
        // lexicographically smaller sender name.
        self.price
            .cmp(&other.price)
            .then_with(|| other.name.cmp(&self.name))
    }
}

impl PartialOrd for SenderHead {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending transactions ordered by price with per-sender nonce
/// progression.
pub struct TransactionsByPriceAndNonce {
    heap: BinaryHeap<SenderHead>,
    senders: HashMap<Name, VecDeque<Transaction>>,
}

impl TransactionsByPriceAndNonce {
    /// Build the queue from a per-sender pending snapshot.
    ///
    /// Each sender's transactions are sorted nonce-ascending; the heap
    /// is seeded with every sender's lowest-nonce transaction.
    pub fn new(pending: BTreeMap<Name, Vec<Transaction>>) -> Self {
        let mut heap = BinaryHeap::with_capacity(pending.len());
        let mut senders = HashMap::with_capacity(pending.len());

        for (name, mut txs) in pending {
            if txs.is_empty() {
                continue;
            }
            txs.sort_by_key(Transaction::nonce);
            heap.push(SenderHead {
                price: txs[0].gas_price,
                name: name.clone(),
            });
            senders.insert(name, VecDeque::from(txs));
        }

        Self { heap, senders }
    }

    /// The head sender's lowest-nonce transaction, if any.
    pub fn peek(&self) -> Option<&Transaction> {
        let head = self.heap.peek()?;
        self.senders.get(&head.name)?.front()
    }

    /// Advance the head sender past its current transaction.
    ///
    /// If the sender has more pending transactions it re-enters the
    /// heap keyed by its new head price; otherwise it is removed.
    pub fn shift(&mut self) {
        let Some(head) = self.heap.pop() else {
            return;
        };
        let Some(queue) = self.senders.get_mut(&head.name) else {
            return;
        };
        queue.pop_front();
        match queue.front() {
            Some(next) => {
                let price = next.gas_price;
                self.heap.push(SenderHead {
                    price,
                    name: head.name,
                });
            }
            None => {
                self.senders.remove(&head.name);
            }
        }
    }

    /// Drop the head sender and all its remaining transactions.
    pub fn pop(&mut self) {
        if let Some(head) = self.heap.pop() {
            self.senders.remove(&head.name);
        }
    }

    /// Whether any transaction remains.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
