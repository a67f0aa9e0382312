//! Input actions
//!
//! Devices are polled elsewhere; they feed an [`InputState`] which an
//! [`ActionMap`] turns into game actions once per tick.

use std::collections::HashSet;

use bitflags::bitflags;
use rust2d_math::Vec2;

bitflags! {
    /// Keyboard modifiers held with a key or button
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const NONE = 0;
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
    }
}

/// Keyboard keys the simulation binds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable key, stored lowercase
    Char(char),
    Space,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Enter,
    Tab,
}

impl Key {
    pub fn char(c: char) -> Self {
        Key::Char(c.to_ascii_lowercase())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// A key or a mouse button
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputButton {
    Key(Key),
    Mouse(MouseButton),
}

impl From<Key> for InputButton {
    fn from(key: Key) -> Self {
        InputButton::Key(key)
    }
}

impl From<MouseButton> for InputButton {
    fn from(button: MouseButton) -> Self {
        InputButton::Mouse(button)
    }
}

/// Current device state
#[derive(Clone, Debug, Default)]
pub struct InputState {
    held: HashSet<InputButton>,
    modifiers: Modifiers,
    just_pressed: Option<InputButton>,
    cursor: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, button: impl Into<InputButton>) {
        let button = button.into();
        self.held.insert(button);
        self.just_pressed = Some(button);
    }

    pub fn release(&mut self, button: impl Into<InputButton>) {
        self.held.remove(&button.into());
    }

    pub fn is_held(&self, button: impl Into<InputButton>) -> bool {
        self.held.contains(&button.into())
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Last press not yet consumed by a dispatch
    pub fn just_pressed(&self) -> Option<InputButton> {
        self.just_pressed
    }

    pub fn set_cursor(&mut self, cursor: Vec2) {
        self.cursor = cursor;
    }

    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    /// Forget everything, e.g. when focus is lost
    pub fn clear(&mut self) {
        self.held.clear();
        self.just_pressed = None;
        self.modifiers = Modifiers::NONE;
    }
}

/// How a binding fires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Once per press
    Single,
    /// Every tick while held
    Repeat,
}

#[derive(Clone, Debug)]
pub struct Binding<A> {
    pub modifiers: Modifiers,
    pub button: InputButton,
    pub trigger: Trigger,
    pub action: A,
    pub help: String,
}

/// Maps (modifiers, button) combinations to actions
#[derive(Clone, Debug)]
pub struct ActionMap<A> {
    bindings: Vec<Binding<A>>,
}

impl<A> Default for ActionMap<A> {
    fn default() -> Self {
        Self { bindings: Vec::new() }
    }
}

impl<A: Copy> ActionMap<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_single(&mut self, modifiers: Modifiers, button: impl Into<InputButton>, action: A, help: impl Into<String>) {
        self.bind(modifiers, button.into(), Trigger::Single, action, help.into());
    }

    pub fn bind_repeat(&mut self, modifiers: Modifiers, button: impl Into<InputButton>, action: A, help: impl Into<String>) {
        self.bind(modifiers, button.into(), Trigger::Repeat, action, help.into());
    }

    /// Later bindings of the same combination replace earlier ones
    fn bind(&mut self, modifiers: Modifiers, button: InputButton, trigger: Trigger, action: A, help: String) {
        self.bindings
            .retain(|b| !(b.modifiers == modifiers && b.button == button && b.trigger == trigger));
        self.bindings.push(Binding { modifiers, button, trigger, action, help });
    }

    pub fn bindings(&self) -> &[Binding<A>] {
        &self.bindings
    }

    /// Actions triggered this tick. Consumes the pending press.
    pub fn dispatch(&self, input: &mut InputState) -> Vec<A> {
        let pressed = input.just_pressed.take();
        self.bindings
            .iter()
            .filter(|b| b.modifiers == input.modifiers)
            .filter(|b| match b.trigger {
                Trigger::Single => pressed == Some(b.button),
                Trigger::Repeat => input.held.contains(&b.button),
            })
            .map(|b| b.action)
            .collect()
    }

    /// One line per binding, e.g. `ctrl+s: slow down`
    pub fn help_lines(&self) -> Vec<String> {
        self.bindings
            .iter()
            .map(|b| format!("{}{}: {}", modifier_prefix(b.modifiers), button_name(b.button), b.help))
            .collect()
    }
}

fn modifier_prefix(modifiers: Modifiers) -> String {
    let mut prefix = String::new();
    if modifiers.contains(Modifiers::CTRL) {
        prefix.push_str("ctrl+");
    }
    if modifiers.contains(Modifiers::ALT) {
        prefix.push_str("alt+");
    }
    if modifiers.contains(Modifiers::SHIFT) {
        prefix.push_str("shift+");
    }
    prefix
}

fn button_name(button: InputButton) -> String {
    match button {
        InputButton::Key(Key::Char(c)) => c.to_string(),
        InputButton::Key(key) => format!("{:?}", key).to_lowercase(),
        InputButton::Mouse(m) => format!("mouse {:?}", m).to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Action {
        Fire,
        Thrust,
        Slow,
    }

    fn map() -> ActionMap<Action> {
        let mut map = ActionMap::new();
        map.bind_single(Modifiers::NONE, Key::Space, Action::Fire, "fire");
        map.bind_repeat(Modifiers::NONE, Key::Up, Action::Thrust, "thrust");
        map.bind_single(Modifiers::CTRL, Key::char('s'), Action::Slow, "slow down");
        map
    }

    #[test]
    fn test_single_fires_once() {
        let map = map();
        let mut input = InputState::new();
        input.press(Key::Space);
        assert_eq!(map.dispatch(&mut input), vec![Action::Fire]);
        assert!(map.dispatch(&mut input).is_empty());
    }

    #[test]
    fn test_repeat_fires_while_held() {
        let map = map();
        let mut input = InputState::new();
        input.press(Key::Up);
        assert_eq!(map.dispatch(&mut input), vec![Action::Thrust]);
        assert_eq!(map.dispatch(&mut input), vec![Action::Thrust]);
        input.release(Key::Up);
        assert!(map.dispatch(&mut input).is_empty());
    }

    #[test]
    fn test_modifiers_must_match() {
        let map = map();
        let mut input = InputState::new();
        input.press(Key::char('S'));
        assert!(map.dispatch(&mut input).is_empty());
        input.set_modifiers(Modifiers::CTRL);
        input.press(Key::char('s'));
        assert_eq!(map.dispatch(&mut input), vec![Action::Slow]);
    }

    #[test]
    fn test_mouse_binding() {
        let mut map = ActionMap::new();
        map.bind_single(Modifiers::NONE, MouseButton::Left, Action::Fire, "fire");
        let mut input = InputState::new();
        input.press(MouseButton::Left);
        assert!(input.is_held(MouseButton::Left));
        assert_eq!(map.dispatch(&mut input), vec![Action::Fire]);
    }

    #[test]
    fn test_help_lines() {
        let lines = map().help_lines();
        assert_eq!(lines.len(), 3);
        assert!(lines.contains(&"ctrl+s: slow down".to_string()));
        assert!(lines.contains(&"space: fire".to_string()));
    }
}
