// =============================================================================
// Sliding Extrema Buffer — fixed-capacity ring with running high / low
// =============================================================================
//
// A circular FIFO of the last `capacity` samples.  The slot holding the current
// high and the slot holding the current low are tracked by index:
//
//   push(v) with v >= high  => high slot moves to the new sample     O(1)
//   push(v) evicting high   => rescan every resident slot            O(N)
//   otherwise               => high slot unchanged                   O(1)
//
// (mirrored for the low).  The O(N) rescan only happens when the running
// extremum leaves the window, which keeps updates amortised O(1).
//
// Two seed values occupy the last two slots at construction so `high()` and
// `low()` are meaningful before the buffer has seen `capacity` real pushes.
// =============================================================================

/// Smallest supported capacity: one slot per seed.
pub const MIN_CAPACITY: usize = 2;

/// Fixed-size ring buffer that keeps its running maximum and minimum current
/// on every push.
#[derive(Debug, Clone)]
pub struct SlidingExtremaBuffer {
    slots: Vec<f64>,
    /// Slot of the most recently pushed sample.
    head: usize,
    /// Slot of the oldest sample — the next one to be overwritten.
    tail: usize,
    max_slot: usize,
    min_slot: usize,
}

impl SlidingExtremaBuffer {
    /// Create a buffer of `capacity` slots (at least [`MIN_CAPACITY`]).
    ///
    /// `init_low` fills every slot except the last, which holds `init_high`,
    /// so the two seeds are the last two values to be evicted.
    pub fn new(capacity: usize, init_high: f64, init_low: f64) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        let mut slots = vec![init_low; capacity];
        slots[capacity - 1] = init_high;

        let mut buffer = Self {
            slots,
            head: capacity - 1,
            tail: 0,
            max_slot: capacity - 1,
            min_slot: capacity - 2,
        };
        // Seeds may be passed in either order.
        buffer.rescan_high();
        buffer.rescan_low();
        buffer
    }

    /// Push `value`, overwriting the oldest slot.  Returns the value that left
    /// the window.
    pub fn push(&mut self, value: f64) -> f64 {
        let slot = self.tail;
        let evicted = self.slots[slot];
        let high = self.slots[self.max_slot];
        let low = self.slots[self.min_slot];

        self.slots[slot] = value;
        self.head = slot;
        self.tail = (slot + 1) % self.slots.len();

        if value >= high {
            self.max_slot = slot;
        } else if self.max_slot == slot {
            self.rescan_high();
        }

        if value <= low {
            self.min_slot = slot;
        } else if self.min_slot == slot {
            self.rescan_low();
        }

        evicted
    }

    /// Largest resident value.
    pub fn high(&self) -> f64 {
        self.slots[self.max_slot]
    }

    /// Smallest resident value.
    pub fn low(&self) -> f64 {
        self.slots[self.min_slot]
    }

    /// Most recently pushed value.
    pub fn newest(&self) -> f64 {
        self.slots[self.head]
    }

    /// The value the next `push` will evict.
    pub fn oldest(&self) -> f64 {
        self.slots[self.tail]
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Walk the ring oldest-first so that `>=` leaves the most recent slot on
    /// ties.
    fn rescan_high(&mut self) {
        let n = self.slots.len();
        let mut best = self.tail;
        for step in 1..n {
            let slot = (self.tail + step) % n;
            if self.slots[slot] >= self.slots[best] {
                best = slot;
            }
        }
        self.max_slot = best;
    }

    fn rescan_low(&mut self) {
        let n = self.slots.len();
        let mut best = self.tail;
        for step in 1..n {
            let slot = (self.tail + step) % n;
            if self.slots[slot] <= self.slots[best] {
                best = slot;
            }
        }
        self.min_slot = best;
    }
}
