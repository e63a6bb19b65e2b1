#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Input sources that turn keyboard state or an external command feed into
//! the nine-directive [`InputCommand`] consumed by the flight controller.

use std::sync::{
    atomic::{AtomicU16, Ordering},
    Arc,
};

use neuroflight_core::{InputCommand, InputMode, KeyboardState};

/// Minimum time the external `start` bit must be held before takeoff.
pub const DEFAULT_START_HOLD_SECONDS: f32 = 0.2;

/// Anything that can produce the command for the next tick.
pub trait InputSource {
    /// Produces the command for a tick lasting `dt` seconds.
    fn poll(&mut self, dt: f32) -> InputCommand;

    /// Informs the source that a reported `start` directive triggered a takeoff.
    fn acknowledge_start(&mut self) {}
}

/// Rising edges of the motor keys observed since the last call to
/// [`KeyboardSource::take_edges`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyEdges {
    /// `F` went down: restart the motors, even mid-air.
    pub restart: bool,
    /// `G` went down: cut the motors.
    pub cut: bool,
}

/// Source backed by the currently held keys.
#[derive(Clone, Debug, Default)]
pub struct KeyboardSource {
    state: KeyboardState,
    edges: KeyEdges,
}

impl KeyboardSource {
    /// Creates a source with no keys held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held keys and records rising edges of `F` and `G`.
    pub fn set_state(&mut self, state: KeyboardState) {
        self.edges.restart |= state.f && !self.state.f;
        self.edges.cut |= state.g && !self.state.g;
        self.state = state;
    }

    /// Keys currently held.
    #[must_use]
    pub const fn state(&self) -> KeyboardState {
        self.state
    }

    /// Returns and clears the edges recorded since the previous call.
    pub fn take_edges(&mut self) -> KeyEdges {
        std::mem::take(&mut self.edges)
    }

    /// Command corresponding to the held keys.
    #[must_use]
    pub fn command(&self) -> InputCommand {
        map_keys(&self.state)
    }
}

impl InputSource for KeyboardSource {
    fn poll(&mut self, _dt: f32) -> InputCommand {
        self.command()
    }
}

/// Maps held keys onto directives.
///
/// `A` and `D` strafe on their own but turn while `W` is held.
#[must_use]
pub fn map_keys(keys: &KeyboardState) -> InputCommand {
    InputCommand {
        start: keys.space || keys.f,
        up: keys.space,
        down: keys.shift,
        forward: keys.w,
        back: keys.s,
        left: keys.a && !keys.w,
        right: keys.d && !keys.w,
        turn_left: keys.w && keys.a,
        turn_right: keys.w && keys.d,
    }
}

/// Shared cell holding the most recent externally written command.
///
/// The nine directives live in one atomic word, so a reader always observes a
/// complete write and the last write before a tick wins.
#[derive(Clone, Debug, Default)]
pub struct CommandSlot {
    bits: Arc<AtomicU16>,
}

impl CommandSlot {
    /// Creates a slot holding [`InputCommand::IDLE`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a complete command.
    pub fn store(&self, command: InputCommand) {
        self.bits.store(command.to_bits(), Ordering::Release);
    }

    /// Reads the most recently published command.
    #[must_use]
    pub fn load(&self) -> InputCommand {
        InputCommand::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Resets the slot to [`InputCommand::IDLE`].
    pub fn clear(&self) {
        self.store(InputCommand::IDLE);
    }
}

/// Hold timer that filters momentary `start` signals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StartDebounce {
    hold: f32,
    held: f32,
}

impl StartDebounce {
    /// Creates a debounce that requires `hold` seconds of continuous signal.
    #[must_use]
    pub const fn new(hold: f32) -> Self {
        Self { hold, held: 0.0 }
    }

    /// Advances the timer and reports whether the signal has been held long enough.
    pub fn update(&mut self, raw: bool, dt: f32) -> bool {
        if raw {
            self.held += dt;
        } else {
            self.held = 0.0;
        }
        self.held >= self.hold
    }

    /// Clears the accumulated hold time after a takeoff consumed it.
    pub fn consume(&mut self) {
        self.held = 0.0;
    }

    /// Seconds the signal has been held continuously.
    #[must_use]
    pub const fn held(&self) -> f32 {
        self.held
    }
}

impl Default for StartDebounce {
    fn default() -> Self {
        Self::new(DEFAULT_START_HOLD_SECONDS)
    }
}

/// Source backed by a [`CommandSlot`] written from outside the simulation.
#[derive(Clone, Debug, Default)]
pub struct ExternalSource {
    slot: CommandSlot,
    debounce: StartDebounce,
}

impl ExternalSource {
    /// Creates a source reading `slot` with the provided start debounce.
    #[must_use]
    pub fn new(slot: CommandSlot, debounce: StartDebounce) -> Self {
        Self { slot, debounce }
    }

    /// Shared slot that outside code writes commands into.
    #[must_use]
    pub fn slot(&self) -> &CommandSlot {
        &self.slot
    }
}

impl InputSource for ExternalSource {
    fn poll(&mut self, dt: f32) -> InputCommand {
        let raw = self.slot.load();
        InputCommand {
            start: self.debounce.update(raw.start, dt),
            ..raw
        }
    }

    fn acknowledge_start(&mut self) {
        self.debounce.consume();
    }
}

/// Switches between the keyboard and the external feed.
///
/// Both sources are polled every tick so the external start debounce keeps
/// running; movement directives come only from the active source.
#[derive(Clone, Debug)]
pub struct InputRouter {
    mode: InputMode,
    keyboard: KeyboardSource,
    external: ExternalSource,
}

impl InputRouter {
    /// Creates a router in `mode` reading the external feed from `external`.
    #[must_use]
    pub fn new(mode: InputMode, external: ExternalSource) -> Self {
        Self {
            mode,
            keyboard: KeyboardSource::new(),
            external,
        }
    }

    /// Active source.
    #[must_use]
    pub const fn mode(&self) -> InputMode {
        self.mode
    }

    /// Selects the active source. Returns whether the mode changed.
    pub fn set_mode(&mut self, mode: InputMode) -> bool {
        if self.mode == mode {
            return false;
        }
        tracing::debug!(?mode, "input source switched");
        self.mode = mode;
        true
    }

    /// Keyboard source, for feeding key state and reading edges.
    pub fn keyboard_mut(&mut self) -> &mut KeyboardSource {
        &mut self.keyboard
    }

    /// Slot backing the external source.
    #[must_use]
    pub fn command_slot(&self) -> &CommandSlot {
        self.external.slot()
    }
}

impl InputSource for InputRouter {
    fn poll(&mut self, dt: f32) -> InputCommand {
        let keyboard = self.keyboard.poll(dt);
        let external = self.external.poll(dt);
        let start = keyboard.start || external.start;
        let active = match self.mode {
            InputMode::Keyboard => keyboard,
            InputMode::External => external,
        };
        InputCommand { start, ..active }
    }

    fn acknowledge_start(&mut self) {
        self.external.acknowledge_start();
    }
}
