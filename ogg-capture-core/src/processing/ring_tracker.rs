use crate::models::error::{InputError, RecorderError};

/// Read cursor into a device ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureCursor {
    pub last_position: usize,
    pub total_samples_accepted: u64,
}

/// Outcome of one [`RingTracker::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollResult {
    pub available: usize,
    /// The device passed the end of its ring since the last commit.
    pub wrapped: bool,
}

/// Tracks the device's write position across polls.
///
/// Only the contiguous region starting at the cursor is reported. When the
/// device has wrapped, that is the tail up to the end of the ring; the
/// segment from index 0 shows up on the next poll. The cursor only moves
/// on [`commit`](Self::commit), so a failed read can be retried.
#[derive(Debug, Default)]
pub struct RingTracker {
    cursor: CaptureCursor,
    capacity: usize,
    reported: usize,
}

impl RingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll(&mut self, current_position: usize, buffer_capacity: usize) -> PollResult {
        self.capacity = buffer_capacity;
        let last = self.cursor.last_position;

        let result = if buffer_capacity == 0
            || (current_position == 0 && last == 0 && self.cursor.total_samples_accepted == 0)
        {
            PollResult {
                available: 0,
                wrapped: false,
            }
        } else if current_position < last {
            PollResult {
                available: buffer_capacity - last,
                wrapped: true,
            }
        } else {
            PollResult {
                available: current_position.min(buffer_capacity) - last,
                wrapped: false,
            }
        };

        self.reported = result.available;
        result
    }

    /// Advance past `consumed` samples of the last poll.
    pub fn commit(&mut self, consumed: usize) -> Result<(), RecorderError> {
        if consumed > self.reported {
            return Err(InputError::CommitOverrun {
                requested: consumed,
                available: self.reported,
            }
            .into());
        }
        if consumed == 0 {
            return Ok(());
        }
        self.cursor.last_position = (self.cursor.last_position + consumed) % self.capacity;
        self.cursor.total_samples_accepted += consumed as u64;
        self.reported -= consumed;
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn cursor(&self) -> CaptureCursor {
        self.cursor
    }

    pub fn last_position(&self) -> usize {
        self.cursor.last_position
    }

    pub fn total_accepted(&self) -> u64 {
        self.cursor.total_samples_accepted
    }
}
