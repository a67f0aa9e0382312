//! Key bindings for the demo
//!
//! Maps keyboard and mouse combinations to the demo's actions. Thrust and
//! rotation repeat while held; everything else fires once per press.

use rust2d_core::{ActionMap, Key, Modifiers, MouseButton};

/// Actions the demo reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DemoAction {
    /// Shoot a bullet from the ship (Space)
    Fire,
    /// Drop a bomb at the cursor (left click)
    Bomb,
    /// Accelerate the ship along its heading (Up, held)
    Thrust,
    /// Turn the ship counter-clockwise (Left, held)
    RotateLeft,
    /// Turn the ship clockwise (Right, held)
    RotateRight,
    /// Split the ship into its parts (D)
    Decompose,
    /// Start or stop the ship's trail (T)
    ToggleTrace,
    /// Larger time step (Ctrl+F)
    SpeedUp,
    /// Smaller time step (Ctrl+S)
    SlowDown,
    /// Stop the simulation (Escape)
    Quit,
}

/// Build the demo's action map
pub fn bindings() -> ActionMap<DemoAction> {
    let mut map = ActionMap::new();
    map.bind_single(Modifiers::NONE, Key::Space, DemoAction::Fire, "fire");
    map.bind_single(Modifiers::NONE, MouseButton::Left, DemoAction::Bomb, "drop a bomb at the cursor");
    map.bind_repeat(Modifiers::NONE, Key::Up, DemoAction::Thrust, "thrust");
    map.bind_repeat(Modifiers::NONE, Key::Left, DemoAction::RotateLeft, "rotate left");
    map.bind_repeat(Modifiers::NONE, Key::Right, DemoAction::RotateRight, "rotate right");
    map.bind_single(Modifiers::NONE, Key::char('d'), DemoAction::Decompose, "split the ship");
    map.bind_single(Modifiers::NONE, Key::char('t'), DemoAction::ToggleTrace, "toggle trail");
    map.bind_single(Modifiers::CTRL, Key::char('f'), DemoAction::SpeedUp, "speed up");
    map.bind_single(Modifiers::CTRL, Key::char('s'), DemoAction::SlowDown, "slow down");
    map.bind_single(Modifiers::NONE, Key::Escape, DemoAction::Quit, "quit");
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust2d_core::InputState;

    #[test]
    fn test_space_fires_once() {
        let map = bindings();
        let mut input = InputState::new();
        input.press(Key::Space);
        assert_eq!(map.dispatch(&mut input), vec![DemoAction::Fire]);
        // Held but no new press
        assert!(map.dispatch(&mut input).is_empty());
    }

    #[test]
    fn test_thrust_repeats_while_held() {
        let map = bindings();
        let mut input = InputState::new();
        input.press(Key::Up);
        assert_eq!(map.dispatch(&mut input), vec![DemoAction::Thrust]);
        assert_eq!(map.dispatch(&mut input), vec![DemoAction::Thrust]);
        input.release(Key::Up);
        assert!(map.dispatch(&mut input).is_empty());
    }

    #[test]
    fn test_modifiers_select_binding() {
        let map = bindings();
        let mut input = InputState::new();
        input.set_modifiers(Modifiers::CTRL);
        input.press(Key::char('s'));
        assert_eq!(map.dispatch(&mut input), vec![DemoAction::SlowDown]);

        // Plain 's' is unbound
        input.release(Key::char('s'));
        input.set_modifiers(Modifiers::NONE);
        input.press(Key::char('s'));
        assert!(map.dispatch(&mut input).is_empty());
    }

    #[test]
    fn test_mouse_drops_bomb() {
        let map = bindings();
        let mut input = InputState::new();
        input.press(MouseButton::Left);
        assert_eq!(map.dispatch(&mut input), vec![DemoAction::Bomb]);
    }

    #[test]
    fn test_help_lists_every_binding() {
        let map = bindings();
        let help = map.help_lines();
        assert_eq!(help.len(), map.bindings().len());
        assert!(help.contains(&"ctrl+s: slow down".to_string()));
        assert!(help.contains(&"space: fire".to_string()));
    }
}
