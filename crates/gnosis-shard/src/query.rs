use gnosis_codec::Identity;

/// One leg of a selection request: match entities whose signature is a
/// superset of `syndrome`, writing up to `capacity` matching keys into
/// `storage`. `overrun` becomes `true` once `storage` is full.
#[derive(Debug, Clone)]
pub struct ShardQuery {
    pub syndrome: Vec<Identity>,
    pub storage: Vec<Identity>,
    pub capacity: usize,
    pub overrun: bool,
}

impl ShardQuery {
    pub fn new(syndrome: Vec<Identity>, capacity: usize) -> Self {
        ShardQuery {
            syndrome,
            storage: Vec::with_capacity(capacity),
            capacity,
            overrun: false,
        }
    }

    pub fn num(&self) -> usize {
        self.storage.len()
    }

    pub fn reset(&mut self) {
        self.storage.clear();
        self.overrun = self.capacity == 0;
    }

    pub(crate) fn push(&mut self, id: Identity) {
        self.storage.push(id);
        if self.storage.len() >= self.capacity {
            self.overrun = true;
        }
    }
}

/// A batch of queries dispatched to a single shard in one handshake.
pub type ShardRequest = Vec<ShardQuery>;
