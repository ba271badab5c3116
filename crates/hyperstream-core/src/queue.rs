//! Partitioned inbound data queues.
//!
//! The read loop is the only writer and only ever appends. Readers take
//! snapshot copies; clearing one partition never touches the others.

use parking_lot::Mutex;

use crate::message::{DataKind, IncomingData};

/// Destination partition for a classified item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// Live actions and deltas.
    Data,
    /// Last-irreversible-block updates.
    Lib,
    /// Fork notices affecting reversible data.
    Reversible,
}

impl QueueKind {
    /// Partition for a kind, or `None` for control/unknown messages which are
    /// never queued.
    pub fn for_kind(kind: &DataKind) -> Option<Self> {
        match kind {
            DataKind::Action | DataKind::Delta => Some(Self::Data),
            DataKind::LibUpdate => Some(Self::Lib),
            DataKind::ForkNotice => Some(Self::Reversible),
            DataKind::Other(_) => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DataQueues {
    data: Mutex<Vec<IncomingData>>,
    lib: Mutex<Vec<IncomingData>>,
    reversible: Mutex<Vec<IncomingData>>,
}

impl DataQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, queue: QueueKind) -> &Mutex<Vec<IncomingData>> {
        match queue {
            QueueKind::Data => &self.data,
            QueueKind::Lib => &self.lib,
            QueueKind::Reversible => &self.reversible,
        }
    }

    pub fn push(&self, queue: QueueKind, item: IncomingData) {
        self.slot(queue).lock().push(item);
    }

    /// Copy of the partition's current contents, oldest first.
    pub fn snapshot(&self, queue: QueueKind) -> Vec<IncomingData> {
        self.slot(queue).lock().clone()
    }

    /// Take the partition's contents, leaving it empty.
    pub fn drain(&self, queue: QueueKind) -> Vec<IncomingData> {
        std::mem::take(&mut *self.slot(queue).lock())
    }

    pub fn clear(&self, queue: QueueKind) {
        self.slot(queue).lock().clear();
    }

    pub fn len(&self, queue: QueueKind) -> usize {
        self.slot(queue).lock().len()
    }

    pub fn is_empty(&self, queue: QueueKind) -> bool {
        self.len(queue) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: DataKind, block_num: u64) -> IncomingData {
        IncomingData {
            kind,
            block_num,
            content: serde_json::Value::Null,
        }
    }

    fn enqueue(queues: &DataQueues, item: IncomingData) {
        let queue = QueueKind::for_kind(&item.kind).unwrap();
        queues.push(queue, item);
    }

    #[test]
    fn clear_data_leaves_other_partitions() {
        let queues = DataQueues::new();
        enqueue(&queues, item(DataKind::Action, 10));
        enqueue(&queues, item(DataKind::LibUpdate, 8));
        enqueue(&queues, item(DataKind::ForkNotice, 9));

        queues.clear(QueueKind::Data);

        assert!(queues.is_empty(QueueKind::Data));
        assert_eq!(queues.len(QueueKind::Lib), 1);
        assert_eq!(queues.len(QueueKind::Reversible), 1);
    }

    #[test]
    fn drain_returns_items_in_order_and_empties() {
        let queues = DataQueues::new();
        enqueue(&queues, item(DataKind::Action, 1));
        enqueue(&queues, item(DataKind::Delta, 2));

        let drained = queues.drain(QueueKind::Data);
        assert_eq!(
            drained.iter().map(|i| i.block_num).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(queues.is_empty(QueueKind::Data));
    }

    #[test]
    fn other_kinds_have_no_partition() {
        assert_eq!(QueueKind::for_kind(&DataKind::Other("ack".into())), None);
        assert_eq!(QueueKind::for_kind(&DataKind::Delta), Some(QueueKind::Data));
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let queues = DataQueues::new();
        enqueue(&queues, item(DataKind::Action, 1));
        let snapshot = queues.snapshot(QueueKind::Data);
        enqueue(&queues, item(DataKind::Action, 2));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(queues.len(QueueKind::Data), 2);
    }
}
