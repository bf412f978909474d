use serde::{Deserialize, Serialize};

const CENTRE_BIT: u8 = 1;
const LEFT_BIT: u8 = 2;
const RIGHT_BIT: u8 = 4;
const UP_BIT: u8 = 8;
const DOWN_BIT: u8 = 16;

/// Left/right/up/down state of a directional input. Diagonals combine one
/// horizontal and one vertical flag; `Centre` is the neutral position and
/// `None` means "not directional".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Lrud {
    #[default]
    None,
    Centre,
    Left,
    Right,
    Up,
    Down,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Lrud {
    pub fn bits(self) -> u8 {
        match self {
            Lrud::None => 0,
            Lrud::Centre => CENTRE_BIT,
            Lrud::Left => LEFT_BIT,
            Lrud::Right => RIGHT_BIT,
            Lrud::Up => UP_BIT,
            Lrud::Down => DOWN_BIT,
            Lrud::UpLeft => UP_BIT | LEFT_BIT,
            Lrud::UpRight => UP_BIT | RIGHT_BIT,
            Lrud::DownLeft => DOWN_BIT | LEFT_BIT,
            Lrud::DownRight => DOWN_BIT | RIGHT_BIT,
        }
    }

    /// Builds a state from flag bits. Opposing flags cancel out.
    pub fn from_bits(bits: u8) -> Self {
        let left = bits & LEFT_BIT != 0;
        let right = bits & RIGHT_BIT != 0;
        let up = bits & UP_BIT != 0;
        let down = bits & DOWN_BIT != 0;
        Self::from_flags(left && !right, right && !left, up && !down, down && !up)
            .unwrap_or(if bits & CENTRE_BIT != 0 {
                Lrud::Centre
            } else {
                Lrud::None
            })
    }

    /// Combines pressed direction flags, e.g. from d-pad buttons.
    /// Returns `Centre` when nothing is pressed.
    pub fn from_buttons(left: bool, right: bool, up: bool, down: bool) -> Self {
        Self::from_flags(left && !right, right && !left, up && !down, down && !up)
            .unwrap_or(Lrud::Centre)
    }

    fn from_flags(left: bool, right: bool, up: bool, down: bool) -> Option<Self> {
        match (left, right, up, down) {
            (true, _, true, _) => Some(Lrud::UpLeft),
            (_, true, true, _) => Some(Lrud::UpRight),
            (true, _, _, true) => Some(Lrud::DownLeft),
            (_, true, _, true) => Some(Lrud::DownRight),
            (true, _, _, _) => Some(Lrud::Left),
            (_, true, _, _) => Some(Lrud::Right),
            (_, _, true, _) => Some(Lrud::Up),
            (_, _, _, true) => Some(Lrud::Down),
            _ => None,
        }
    }

    /// True if every flag of `flag` is set in `self`
    pub fn has(self, flag: Lrud) -> bool {
        let bits = flag.bits();
        bits != 0 && self.bits() & bits == bits
    }

    /// True for any state pointing somewhere
    pub fn is_directed(self) -> bool {
        !matches!(self, Lrud::None | Lrud::Centre)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bits_combines_diagonals() {
        assert_eq!(Lrud::from_bits(UP_BIT | RIGHT_BIT), Lrud::UpRight);
        assert_eq!(Lrud::from_bits(DOWN_BIT | LEFT_BIT), Lrud::DownLeft);
        assert_eq!(Lrud::from_bits(CENTRE_BIT), Lrud::Centre);
        assert_eq!(Lrud::from_bits(0), Lrud::None);
        assert_eq!(Lrud::from_bits(LEFT_BIT | RIGHT_BIT), Lrud::None);
    }

    #[test]
    fn test_from_buttons() {
        assert_eq!(Lrud::from_buttons(false, false, false, false), Lrud::Centre);
        assert_eq!(Lrud::from_buttons(true, false, false, true), Lrud::DownLeft);
        assert_eq!(Lrud::from_buttons(true, true, true, false), Lrud::Up);
    }

    #[test]
    fn test_has_flag() {
        assert!(Lrud::UpLeft.has(Lrud::Left));
        assert!(Lrud::UpLeft.has(Lrud::Up));
        assert!(!Lrud::UpLeft.has(Lrud::Right));
        assert!(!Lrud::Left.has(Lrud::None));
        assert!(!Lrud::Centre.is_directed());
        assert!(Lrud::Down.is_directed());
    }
}
