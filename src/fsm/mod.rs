//! Function-pointer finite state machine engine.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                      │
//! │  ┌─────────────────┬──────────────┬──────────────┬─────────────┐ │
//! │  │ PowerState      │ on_enter     │ on_exit      │ on_update   │ │
//! │  ├─────────────────┼──────────────┼──────────────┼─────────────┤ │
//! │  │ Configuring     │ fn(ctx, p)   │ fn(ctx, p)   │ fn(..)->Opt │ │
//! │  │ Acquiring       │      ·       │      ·       │      ·      │ │
//! │  │ Transmitting    │      ·       │      ·       │      ·      │ │
//! │  │ FaultIndicating │      ·       │      ·       │      ·      │ │
//! │  │ PoweringDown    │      ·       │      ·       │      ·      │ │
//! │  │ Asleep          │      ·       │      ·       │      ·      │ │
//! │  └─────────────────┴──────────────┴──────────────┴─────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the
//! current pointer. Handlers receive the shared [`CycleContext`] and the
//! port bundle `P`; the engine itself places no bound on `P`.

pub mod context;
pub mod states;

use context::CycleContext;
use log::debug;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every phase of the duty cycle.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PowerState {
    Configuring = 0,
    Acquiring = 1,
    Transmitting = 2,
    FaultIndicating = 3,
    PoweringDown = 4,
    Asleep = 5,
}

impl PowerState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 6;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Configuring,
        Self::Acquiring,
        Self::Transmitting,
        Self::FaultIndicating,
        Self::PoweringDown,
        Self::Asleep,
    ];

    /// Convert an index back to `PowerState`. Out-of-range indices assert
    /// in debug builds and map to `PoweringDown` in release, the state
    /// that leaves the hardware quiet.
    pub fn from_index(idx: usize) -> Self {
        match Self::ALL.get(idx) {
            Some(state) => *state,
            None => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::PoweringDown
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn<P> = fn(&mut CycleContext, &mut P);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn<P> = fn(&mut CycleContext, &mut P) -> Option<PowerState>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor<P> {
    pub id: PowerState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn<P>>,
    pub on_exit: Option<StateActionFn<P>>,
    pub on_update: StateUpdateFn<P>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm<P> {
    /// Fixed-size table indexed by `PowerState as usize`.
    table: [StateDescriptor<P>; PowerState::COUNT],
    current: usize,
    tick_count: u64,
}

impl<P> Fsm<P> {
    pub fn new(table: [StateDescriptor<P>; PowerState::COUNT], initial: PowerState) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut CycleContext, ports: &mut P) {
        debug!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx, ports);
        }
    }

    /// Advance the FSM by one tick; returns the state after the tick.
    pub fn tick(&mut self, ctx: &mut CycleContext, ports: &mut P) -> PowerState {
        self.tick_count += 1;
        if let Some(next) = (self.table[self.current].on_update)(ctx, ports) {
            self.transition(next, ctx, ports);
        }
        self.current_state()
    }

    pub fn current_state(&self) -> PowerState {
        PowerState::from_index(self.current)
    }

    pub fn state_name(&self) -> &'static str {
        self.table[self.current].name
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    fn transition(&mut self, next_id: PowerState, ctx: &mut CycleContext, ports: &mut P) {
        let next_idx = next_id as usize;
        debug!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx, ports);
        }
        self.current = next_idx;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx, ports);
        }
    }
}
