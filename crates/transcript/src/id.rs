/// Source of word IDs for finalized words.
///
/// Stateful so deterministic implementations are possible; the merger owns
/// one and threads it through every finalization site.
pub trait IdGenerator: Send + Sync {
    fn next_id(&mut self) -> String;
}

/// Random v4 UUIDs, the default generator.
#[derive(Default)]
pub struct UuidIdGen;

impl IdGenerator for UuidIdGen {
    fn next_id(&mut self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Counting generator ("0", "1", "2", …) for tests that assert on IDs.
#[derive(Default)]
pub struct SequentialIdGen {
    next: u64,
}

impl SequentialIdGen {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGen {
    fn next_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }
}
