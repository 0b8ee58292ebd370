bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct JoypadFlags: u8 {
        const NOT_BUTTONS = 1 << 5;
        const NOT_DPAD = 1 << 4;
        const NOT_START_DOWN = 1 << 3;
        const NOT_SELECT_UP = 1 << 2;
        const NOT_B_LEFT = 1 << 1;
        const NOT_A_RIGHT = 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Start,
    Select,
}

#[derive(Clone, Default)]
pub struct JoypadInput {
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
    pub right: bool,
    pub left: bool,
    pub up: bool,
    pub down: bool,
}

#[derive(Clone, Default)]
pub struct Joypad {
    pub(crate) input: JoypadInput,
    pub(crate) dpad_selected: bool,
    pub(crate) buttons_selected: bool,
}

impl Joypad {
    /// Returns true on a released→pressed edge, which is what pulls the
    /// joypad interrupt line.
    #[must_use]
    pub fn set_button(&mut self, button: Button, pressed: bool) -> bool {
        let state = match button {
            Button::A => &mut self.input.a,
            Button::B => &mut self.input.b,
            Button::Select => &mut self.input.select,
            Button::Start => &mut self.input.start,
            Button::Right => &mut self.input.right,
            Button::Left => &mut self.input.left,
            Button::Up => &mut self.input.up,
            Button::Down => &mut self.input.down,
        };
        let edge = !*state && pressed;
        *state = pressed;
        edge
    }

    /// Only the two select lines are writable.
    pub fn set_register(&mut self, value: u8) {
        let value = JoypadFlags::from_bits_retain(value);
        self.dpad_selected = !value.contains(JoypadFlags::NOT_DPAD);
        self.buttons_selected = !value.contains(JoypadFlags::NOT_BUTTONS);
    }

    // Pressed reads as 0 on the bus, one matrix row per select line.
    pub fn get_register(&self) -> u8 {
        let mut value = JoypadFlags::NOT_START_DOWN
            | JoypadFlags::NOT_SELECT_UP
            | JoypadFlags::NOT_B_LEFT
            | JoypadFlags::NOT_A_RIGHT;
        if self.dpad_selected {
            if self.input.down {
                value.remove(JoypadFlags::NOT_START_DOWN);
            }
            if self.input.up {
                value.remove(JoypadFlags::NOT_SELECT_UP);
            }
            if self.input.left {
                value.remove(JoypadFlags::NOT_B_LEFT);
            }
            if self.input.right {
                value.remove(JoypadFlags::NOT_A_RIGHT);
            }
        }
        if self.buttons_selected {
            if self.input.start {
                value.remove(JoypadFlags::NOT_START_DOWN);
            }
            if self.input.select {
                value.remove(JoypadFlags::NOT_SELECT_UP);
            }
            if self.input.b {
                value.remove(JoypadFlags::NOT_B_LEFT);
            }
            if self.input.a {
                value.remove(JoypadFlags::NOT_A_RIGHT);
            }
        }
        value.set(JoypadFlags::NOT_DPAD, !self.dpad_selected);
        value.set(JoypadFlags::NOT_BUTTONS, !self.buttons_selected);
        value.bits() | 0b11000000 // unused bits return 1
    }
}
