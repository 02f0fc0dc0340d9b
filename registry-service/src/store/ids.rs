use registry_client::InstallationId;
use time::OffsetDateTime;

/// Hands out strictly increasing timestamp ids.
///
/// Ids are the current Unix time in milliseconds, bumped past the previous id
/// when the clock has not moved (or moved backwards).
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator that never yields an id `<= last`.
    pub fn starting_after(last: i64) -> Self {
        Self { last }
    }

    pub fn next_id(&mut self) -> InstallationId {
        self.next_at(now_millis())
    }

    fn next_at(&mut self, now_ms: i64) -> InstallationId {
        let id = now_ms.max(self.last.saturating_add(1));
        self.last = id;
        InstallationId(id)
    }
}

fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}
