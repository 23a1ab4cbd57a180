use std::sync::Mutex;

/// Per-frame-slot lists of objects awaiting destruction.
///
/// One list per frame in flight, all behind a single mutex. Items pushed
/// while slot `f` is current are handed back by `drain(f)`, which the owner
/// calls only once the GPU work tagged with slot `f` has completed, i.e.
/// when the frame index has come back around to `f`.
///
/// ```text
/// push(f=0, a)   push(f=1, b)   drain(0) -> [a]   drain(1) -> [b]
/// ```
pub struct DeletionQueue<T> {
    slots: Mutex<Vec<Vec<T>>>,
    frames_in_flight: usize,
}

impl<T> DeletionQueue<T> {
    /// Create a queue with one list per frame in flight
    pub fn new(frames_in_flight: usize) -> Self {
        debug_assert!(frames_in_flight > 0, "deletion queue needs at least one frame slot");
        let frames_in_flight = frames_in_flight.max(1);
        Self {
            slots: Mutex::new((0..frames_in_flight).map(|_| Vec::new()).collect()),
            frames_in_flight,
        }
    }

    /// Queue `item` for destruction once slot `frame` comes around again
    pub fn push(&self, frame: usize, item: T) {
        debug_assert!(frame < self.frames_in_flight, "frame slot {} out of range", frame);
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots[frame % self.frames_in_flight].push(item);
    }

    /// Take every item queued for `frame`, in push order
    pub fn drain(&self, frame: usize) -> Vec<T> {
        debug_assert!(frame < self.frames_in_flight, "frame slot {} out of range", frame);
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut slots[frame % self.frames_in_flight])
    }

    /// Take every queued item from every slot (shutdown path)
    pub fn drain_all(&self) -> Vec<T> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.iter_mut().flat_map(std::mem::take).collect()
    }

    /// Number of items queued for `frame`
    pub fn pending(&self, frame: usize) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots[frame % self.frames_in_flight].len()
    }

    /// Number of items queued across all slots
    pub fn total_pending(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.iter().map(Vec::len).sum()
    }

    /// Number of frame slots
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }
}

#[cfg(test)]
#[path = "deletion_queue_tests.rs"]
mod tests;
