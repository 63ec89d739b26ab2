use serde::Serialize;
use winit::keyboard::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerKey {
    Move(MoveDirection),
    Jump,
}

impl ViewerKey {
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::ArrowUp => Some(Self::Move(MoveDirection::Up)),
            KeyCode::ArrowDown => Some(Self::Move(MoveDirection::Down)),
            KeyCode::ArrowLeft => Some(Self::Move(MoveDirection::Left)),
            KeyCode::ArrowRight => Some(Self::Move(MoveDirection::Right)),
            KeyCode::Space => Some(Self::Jump),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputIntent {
    Move(MoveDirection),
    Stop,
    /// Local only; never forwarded to the server.
    Jump,
}

/// `consumed` is set for every recognized key on both press and release so the
/// platform layer can swallow its default handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyOutcome {
    pub consumed: bool,
    pub intent: Option<InputIntent>,
}

impl KeyOutcome {
    const IGNORED: Self = Self {
        consumed: false,
        intent: None,
    };

    fn consumed(intent: Option<InputIntent>) -> Self {
        Self {
            consumed: true,
            intent,
        }
    }
}

/// Held movement keys in press order; the newest still-held key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldDirections {
    order: Vec<MoveDirection>,
}

impl HeldDirections {
    pub fn push(&mut self, direction: MoveDirection) -> bool {
        if self.order.contains(&direction) {
            return false;
        }
        self.order.push(direction);
        true
    }

    pub fn remove(&mut self, direction: MoveDirection) -> bool {
        let before = self.order.len();
        self.order.retain(|held| *held != direction);
        self.order.len() != before
    }

    pub fn last(&self) -> Option<MoveDirection> {
        self.order.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputController {
    held: HeldDirections,
}

impl InputController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held(&self) -> &HeldDirections {
        &self.held
    }

    pub fn key_down(&mut self, key: Option<ViewerKey>, is_repeat: bool) -> KeyOutcome {
        let Some(key) = key else {
            return KeyOutcome::IGNORED;
        };
        if is_repeat {
            return KeyOutcome::consumed(None);
        }
        match key {
            ViewerKey::Jump => KeyOutcome::consumed(Some(InputIntent::Jump)),
            ViewerKey::Move(direction) => {
                let newly_held = self.held.push(direction);
                KeyOutcome::consumed(newly_held.then_some(InputIntent::Move(direction)))
            }
        }
    }

    pub fn key_up(&mut self, key: Option<ViewerKey>) -> KeyOutcome {
        let Some(key) = key else {
            return KeyOutcome::IGNORED;
        };
        let ViewerKey::Move(direction) = key else {
            return KeyOutcome::consumed(None);
        };
        if !self.held.remove(direction) {
            return KeyOutcome::consumed(None);
        }
        let intent = match self.held.last() {
            Some(remaining) => InputIntent::Move(remaining),
            None => InputIntent::Stop,
        };
        KeyOutcome::consumed(Some(intent))
    }

    /// Drops every held key, e.g. when the window loses focus. Emits a stop if
    /// anything was held.
    pub fn release_all(&mut self) -> Option<InputIntent> {
        if self.held.is_empty() {
            return None;
        }
        self.held.clear();
        Some(InputIntent::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UP: Option<ViewerKey> = Some(ViewerKey::Move(MoveDirection::Up));
    const LEFT: Option<ViewerKey> = Some(ViewerKey::Move(MoveDirection::Left));
    const RIGHT: Option<ViewerKey> = Some(ViewerKey::Move(MoveDirection::Right));

    #[test]
    fn press_emits_move_immediately() {
        let mut input = InputController::new();
        let outcome = input.key_down(UP, false);
        assert!(outcome.consumed);
        assert_eq!(outcome.intent, Some(InputIntent::Move(MoveDirection::Up)));
    }

    #[test]
    fn releasing_newest_key_falls_back_to_previous() {
        let mut input = InputController::new();
        input.key_down(LEFT, false);
        input.key_down(UP, false);
        assert_eq!(
            input.key_up(UP).intent,
            Some(InputIntent::Move(MoveDirection::Left))
        );
        assert_eq!(input.key_up(LEFT).intent, Some(InputIntent::Stop));
    }

    #[test]
    fn last_in_priority_not_first_in() {
        let mut input = InputController::new();
        input.key_down(LEFT, false);
        input.key_down(UP, false);
        input.key_down(RIGHT, false);
        assert_eq!(
            input.key_up(LEFT).intent,
            Some(InputIntent::Move(MoveDirection::Right))
        );
    }

    #[test]
    fn repeats_and_redundant_presses_emit_nothing() {
        let mut input = InputController::new();
        input.key_down(UP, false);
        let repeat = input.key_down(UP, true);
        assert!(repeat.consumed);
        assert_eq!(repeat.intent, None);
        let redundant = input.key_down(UP, false);
        assert!(redundant.consumed);
        assert_eq!(redundant.intent, None);
    }

    #[test]
    fn jump_is_local_intent_and_ignores_repeat() {
        let mut input = InputController::new();
        let jump = Some(ViewerKey::Jump);
        assert_eq!(input.key_down(jump, false).intent, Some(InputIntent::Jump));
        assert_eq!(input.key_down(jump, true).intent, None);
        let release = input.key_up(jump);
        assert!(release.consumed);
        assert_eq!(release.intent, None);
        assert!(input.held().is_empty());
    }

    #[test]
    fn unrecognized_keys_are_not_consumed() {
        let mut input = InputController::new();
        assert_eq!(input.key_down(None, false), KeyOutcome::default());
        assert_eq!(input.key_up(None), KeyOutcome::default());
    }

    #[test]
    fn release_of_unheld_key_is_consumed_silently() {
        let mut input = InputController::new();
        let outcome = input.key_up(RIGHT);
        assert!(outcome.consumed);
        assert_eq!(outcome.intent, None);
    }

    #[test]
    fn release_all_stops_only_when_something_was_held() {
        let mut input = InputController::new();
        assert_eq!(input.release_all(), None);
        input.key_down(UP, false);
        assert_eq!(input.release_all(), Some(InputIntent::Stop));
        assert!(input.held().is_empty());
    }

    #[test]
    fn key_codes_map_to_viewer_keys() {
        assert_eq!(ViewerKey::from_key_code(KeyCode::ArrowLeft), LEFT);
        assert_eq!(ViewerKey::from_key_code(KeyCode::Space), Some(ViewerKey::Jump));
        assert_eq!(ViewerKey::from_key_code(KeyCode::KeyQ), None);
    }
}
