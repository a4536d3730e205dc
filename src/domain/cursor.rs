//! Ingestion cursor value object.

/// The last acknowledged upstream event identifier.
///
/// Defines the resume point for ingestion. Advanced only after a page of
/// events has been durably stored; never rolled back automatically. An
/// explicit operator reset replays from an arbitrary id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    last_event_id: Option<i64>,
}

impl Cursor {
    /// A cursor that has not acknowledged anything yet.
    #[must_use]
    pub fn start() -> Self {
        Self::default()
    }

    /// A cursor positioned at a specific event id.
    #[must_use]
    pub fn at(event_id: i64) -> Self {
        Self {
            last_event_id: Some(event_id),
        }
    }

    /// The last acknowledged event id, if any.
    #[must_use]
    pub fn last_event_id(&self) -> Option<i64> {
        self.last_event_id
    }

    /// Advance to a new high-water mark.
    ///
    /// Advancing never moves backwards; a stale mark is ignored so that a
    /// replayed page cannot regress the resume point.
    pub fn advance(&mut self, event_id: i64) {
        if self.last_event_id.map_or(true, |last| event_id > last) {
            self.last_event_id = Some(event_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_cursor_has_no_position() {
        assert_eq!(Cursor::start().last_event_id(), None);
    }

    #[test]
    fn advance_moves_forward() {
        let mut cursor = Cursor::start();
        cursor.advance(10);
        assert_eq!(cursor.last_event_id(), Some(10));
        cursor.advance(25);
        assert_eq!(cursor.last_event_id(), Some(25));
    }

    #[test]
    fn advance_ignores_stale_marks() {
        let mut cursor = Cursor::at(25);
        cursor.advance(10);
        assert_eq!(cursor.last_event_id(), Some(25));
    }
}
