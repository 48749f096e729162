//! Seeded demonstration scenario: p1..p5 competing for r1 and r2.
//!
//! Randomness comes from an explicitly seeded xorshift64* generator so the
//! same seed always produces the same scenario — no global process-wide
//! random state.

use gridlock_types::{Event, Scenario};

/// Deterministic xorshift64* generator.
struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    /// The state must be non-zero; a zero seed is bumped to one.
    fn new(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound as u64) as usize
    }
}

/// Builds the demo scenario: every process opens with one request, ten
/// extra requests land at random, then the processes finish in shuffled
/// order. One event per time unit.
pub fn contention_scenario(seed: u64) -> Scenario {
    let processes: Vec<String> = (1..=5).map(|i| format!("p{i}")).collect();
    let resources = vec!["r1".to_string(), "r2".to_string()];
    let mut rng = XorShift64Star::new(seed);

    let mut events = Vec::new();
    let mut time = 0;

    for process in &processes {
        events.push(Event::request(time, process, &resources[rng.below(2)]));
        time += 1;
    }

    for _ in 0..10 {
        events.push(Event::request(
            time,
            &processes[rng.below(5)],
            &resources[rng.below(2)],
        ));
        time += 1;
    }

    // Fisher-Yates shuffle for the finish order
    let mut order = processes.clone();
    for i in (1..order.len()).rev() {
        order.swap(i, rng.below(i + 1));
    }
    for process in order {
        events.push(Event::finish(time, process));
        time += 1;
    }

    Scenario { resources, events }
}
