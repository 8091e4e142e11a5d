//! Newtype wrappers and the fixed action vocabulary.

use std::{fmt, ops::Deref, str::FromStr};

use serde::{Deserialize, Serialize};

/// A point in the PCA-reduced space.
pub type ReducedVector = Vec<f64>;

/// Fixed-length feature vector produced by the extractor for one step.
///
/// Immutable once built; the only way to get one is from a `Vec<f64>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Wrap raw values.
    pub fn new(values: Vec<f64>) -> Self {
        FeatureVector(values)
    }

    /// Borrow the values.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Unwrap into the inner vector.
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for FeatureVector {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        FeatureVector(values)
    }
}

/// Controller buttons understood by the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Left,
    Right,
    Down,
    Jump,
    Speed,
}

impl Button {
    /// Number of buttons in a [`ButtonVector`].
    pub const COUNT: usize = 5;

    /// Index of the button in a [`ButtonVector`].
    pub const fn index(self) -> usize {
        match self {
            Button::Left => 0,
            Button::Right => 1,
            Button::Down => 2,
            Button::Jump => 3,
            Button::Speed => 4,
        }
    }
}

/// Boolean press state per [`Button`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ButtonVector([bool; Button::COUNT]);

impl ButtonVector {
    /// No buttons pressed.
    pub const fn released() -> Self {
        ButtonVector([false; Button::COUNT])
    }

    /// Builder-style press.
    pub const fn with(mut self, button: Button) -> Self {
        self.0[button.index()] = true;
        self
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.0[button.index()]
    }

    pub fn as_array(&self) -> [bool; Button::COUNT] {
        self.0
    }
}

/// One of the twelve canonical actions.
///
/// The declaration order is the fixed iteration order used for greedy
/// tie-breaking; [`Action::id`] is the position in that order and is the
/// persisted action identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Stay,
    Jump,
    Speed,
    Left,
    LeftSpeed,
    LeftJump,
    LeftJumpSpeed,
    JumpSpeed,
    Right,
    RightSpeed,
    RightJump,
    RightJumpSpeed,
}

impl Action {
    /// Number of actions.
    pub const COUNT: usize = 12;

    /// Every action, in iteration order.
    pub const ALL: [Action; Action::COUNT] = [
        Action::Stay,
        Action::Jump,
        Action::Speed,
        Action::Left,
        Action::LeftSpeed,
        Action::LeftJump,
        Action::LeftJumpSpeed,
        Action::JumpSpeed,
        Action::Right,
        Action::RightSpeed,
        Action::RightJump,
        Action::RightJumpSpeed,
    ];

    /// Stable identifier (0-11).
    pub fn id(self) -> usize {
        self as usize
    }

    /// Look up an action by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownAction`] if `id >= 12`.
    pub fn from_id(id: usize) -> Result<Self, crate::Error> {
        Action::ALL
            .get(id)
            .copied()
            .ok_or(crate::Error::UnknownAction { id })
    }

    /// Buttons pressed by this action.
    pub fn buttons(self) -> ButtonVector {
        let base = ButtonVector::released();
        match self {
            Action::Stay => base,
            Action::Jump => base.with(Button::Jump),
            Action::Speed => base.with(Button::Speed),
            Action::JumpSpeed => base.with(Button::Jump).with(Button::Speed),
            Action::Left => base.with(Button::Left),
            Action::LeftSpeed => base.with(Button::Left).with(Button::Speed),
            Action::LeftJump => base.with(Button::Left).with(Button::Jump),
            Action::LeftJumpSpeed => base
                .with(Button::Left)
                .with(Button::Jump)
                .with(Button::Speed),
            Action::Right => base.with(Button::Right),
            Action::RightSpeed => base.with(Button::Right).with(Button::Speed),
            Action::RightJump => base.with(Button::Right).with(Button::Jump),
            Action::RightJumpSpeed => base
                .with(Button::Right)
                .with(Button::Jump)
                .with(Button::Speed),
        }
    }

    /// Short kebab-case name, used in CSV exports and logs.
    pub fn name(self) -> &'static str {
        match self {
            Action::Stay => "stay",
            Action::Jump => "jump",
            Action::Speed => "speed",
            Action::Left => "left",
            Action::LeftSpeed => "left-speed",
            Action::LeftJump => "left-jump",
            Action::LeftJumpSpeed => "left-jump-speed",
            Action::JumpSpeed => "jump-speed",
            Action::Right => "right",
            Action::RightSpeed => "right-speed",
            Action::RightJump => "right-jump",
            Action::RightJumpSpeed => "right-jump-speed",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.name() == s)
            .ok_or_else(|| crate::Error::InvalidConfiguration {
                message: format!("unknown action name '{s}'"),
            })
    }
}

/// Key of the value table: abstract state id plus action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateActionKey {
    pub state: usize,
    pub action: Action,
}

impl StateActionKey {
    pub fn new(state: usize, action: Action) -> Self {
        Self { state, action }
    }
}

impl fmt::Display for StateActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.state, self.action)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_action_ids_follow_iteration_order() {
        for (idx, action) in Action::ALL.iter().enumerate() {
            assert_eq!(action.id(), idx);
            assert_eq!(Action::from_id(idx).unwrap(), *action);
        }
        assert!(Action::from_id(12).is_err());
    }

    #[test]
    fn test_button_vectors_are_distinct() {
        let distinct: HashSet<ButtonVector> = Action::ALL.iter().map(|a| a.buttons()).collect();
        assert_eq!(distinct.len(), Action::COUNT);
        assert_eq!(Action::Stay.buttons(), ButtonVector::released());
    }

    #[test]
    fn test_right_jump_speed_buttons() {
        let buttons = Action::RightJumpSpeed.buttons();
        assert!(buttons.is_pressed(Button::Right));
        assert!(buttons.is_pressed(Button::Jump));
        assert!(buttons.is_pressed(Button::Speed));
        assert!(!buttons.is_pressed(Button::Left));
        assert!(!buttons.is_pressed(Button::Down));
    }

    #[test]
    fn test_action_name_roundtrip() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>().unwrap(), action);
        }
    }
}
