//! Input bindings: triggers, controllers and [`EntityInput`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Action, ActionData};

/// Keyboard keys the simulation understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
    Q,
    E,
    Space,
    Shift,
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Intents an AI controller can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiIntent {
    /// Accelerate along the facing.
    Thrust,
    /// Turn toward the steering direction.
    Rotate,
    /// Fire guns.
    Fire,
}

/// What activates a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputTrigger {
    /// Active while the key is held.
    Key(Key),
    /// Active while the button is held.
    Mouse(MouseButton),
    /// Driven by the AI controller's intent intensity.
    Ai(AiIntent),
    /// Active every tick at full intensity.
    Always,
}

/// Who may drive a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerKind {
    /// Human player via keyboard and mouse.
    Player,
    /// AI controller.
    Ai,
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Ai => write!(f, "ai"),
        }
    }
}

/// Polled keyboard and mouse state for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    /// Keys currently held.
    pub keys: BTreeSet<Key>,
    /// Mouse buttons currently held.
    pub mouse_buttons: BTreeSet<MouseButton>,
    /// Cursor position in world space.
    pub cursor: Option<Vec2>,
}

impl InputState {
    /// Marks `key` as held.
    #[must_use]
    pub fn with_key(mut self, key: Key) -> Self {
        self.keys.insert(key);
        self
    }

    /// Marks `button` as held.
    #[must_use]
    pub fn with_mouse(mut self, button: MouseButton) -> Self {
        self.mouse_buttons.insert(button);
        self
    }

    /// Sets the cursor position.
    #[must_use]
    pub fn with_cursor(mut self, cursor: Vec2) -> Self {
        self.cursor = Some(cursor);
        self
    }
}

/// Intent intensities produced by an AI controller, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AiIntents {
    thrust: f32,
    rotate: f32,
    fire: f32,
}

impl AiIntents {
    /// Intensity of `intent`.
    #[must_use]
    pub const fn get(&self, intent: AiIntent) -> f32 {
        match intent {
            AiIntent::Thrust => self.thrust,
            AiIntent::Rotate => self.rotate,
            AiIntent::Fire => self.fire,
        }
    }

    /// Sets `intent` to `value`, clamped to `[0, 1]`. NaN becomes `0`.
    pub fn set(&mut self, intent: AiIntent, value: f32) {
        let value = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };
        match intent {
            AiIntent::Thrust => self.thrust = value,
            AiIntent::Rotate => self.rotate = value,
            AiIntent::Fire => self.fire = value,
        }
    }

    /// Clears every intent.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A configured binding: trigger, action and the controllers it serves.
///
/// `action` is `None` when configuration named an action that could not be
/// built; [`EntityInput::new`] drops such bindings.
#[derive(Debug, Clone)]
pub struct ActionTriplet {
    /// What activates the binding.
    pub trigger: InputTrigger,
    /// Effect to apply.
    pub action: Option<Arc<dyn Action>>,
    /// Controllers allowed to drive the binding. Empty means any.
    pub controllers: Vec<ControllerKind>,
}

impl ActionTriplet {
    /// Binding usable by any controller.
    #[must_use]
    pub fn new(trigger: InputTrigger, action: Arc<dyn Action>) -> Self {
        Self {
            trigger,
            action: Some(action),
            controllers: Vec::new(),
        }
    }

    /// Restricts the binding to `controllers`.
    #[must_use]
    pub fn for_controllers(mut self, controllers: &[ControllerKind]) -> Self {
        self.controllers = controllers.to_vec();
        self
    }

    fn serves(&self, controller: ControllerKind) -> bool {
        self.controllers.is_empty() || self.controllers.contains(&controller)
    }
}

#[derive(Debug, Clone)]
struct Binding {
    trigger: InputTrigger,
    action: Arc<dyn Action>,
}

/// Maps an entity's triggers to its actions.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use driftfire_core::action::{ActionTriplet, ControllerKind, EntityInput, InputTrigger, Key, RotateAction};
///
/// let turn_left = ActionTriplet::new(
///     InputTrigger::Key(Key::A),
///     Arc::new(RotateAction { degrees_per_second: 90.0, affected_by_velocity: false }),
/// )
/// .for_controllers(&[ControllerKind::Player]);
///
/// let input = EntityInput::new(ControllerKind::Ai, vec![turn_left]);
/// assert!(input.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct EntityInput {
    controller: ControllerKind,
    bindings: Vec<Binding>,
}

impl Default for EntityInput {
    fn default() -> Self {
        Self {
            controller: ControllerKind::Player,
            bindings: Vec::new(),
        }
    }
}

impl EntityInput {
    /// Keeps the triplets that serve `controller` and have an action.
    pub fn new(controller: ControllerKind, triplets: Vec<ActionTriplet>) -> Self {
        let bindings = triplets
            .into_iter()
            .filter(|t| t.serves(controller))
            .filter_map(|t| match t.action {
                Some(action) => Some(Binding {
                    trigger: t.trigger,
                    action,
                }),
                None => {
                    warn!(trigger = ?t.trigger, %controller, "binding has no action, dropped");
                    None
                }
            })
            .collect();
        Self {
            controller,
            bindings,
        }
    }

    /// Controller this input serves.
    #[must_use]
    pub const fn controller(&self) -> ControllerKind {
        self.controller
    }

    /// Number of live bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Calls every bound action once, in binding order.
    pub fn apply(&self, data: &mut ActionData<'_>, input: &InputState, intents: &AiIntents) {
        if data.cursor.is_none() {
            data.cursor = input.cursor;
        }
        for binding in &self.bindings {
            let (active, percentage) = Self::trigger_state(binding.trigger, input, intents);
            binding.action.apply(data, active, percentage);
        }
    }

    fn trigger_state(trigger: InputTrigger, input: &InputState, intents: &AiIntents) -> (bool, f32) {
        let held = |on: bool| if on { (true, 1.0) } else { (false, 0.0) };
        match trigger {
            InputTrigger::Key(key) => held(input.keys.contains(&key)),
            InputTrigger::Mouse(button) => held(input.mouse_buttons.contains(&button)),
            InputTrigger::Ai(intent) => {
                let value = intents.get(intent);
                if value > 0.0 {
                    (true, value)
                } else {
                    (false, 0.0)
                }
            }
            InputTrigger::Always => (true, 1.0),
        }
    }
}
