use super::physical::{ControlOption, PhysicalControlType};
use serde::{Deserialize, Serialize};

/// Sentinel id meaning "no value"
pub const DEFAULT_ID: i32 = -1;

/// Input id of an unused mapping slot
pub const NONE_INPUT_ID: u8 = 0;

/// Declares which physical channel a virtual control slot reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputMapping {
    pub input_id: u8,
    pub control_type: PhysicalControlType,
    pub control_index: u8,
    #[serde(default)]
    pub options: ControlOption,
}

impl InputMapping {
    pub fn new(
        input_id: u8,
        control_type: PhysicalControlType,
        control_index: u8,
        options: ControlOption,
    ) -> Self {
        Self {
            input_id,
            control_type,
            control_index,
            options,
        }
    }

    /// Placeholder for a slot that reads nothing
    pub fn unused() -> Self {
        Self::new(NONE_INPUT_ID, PhysicalControlType::Button, 0, ControlOption::None)
    }

    pub fn is_unused(&self) -> bool {
        self.input_id == NONE_INPUT_ID
    }

    /// Packs the mapping into one key, one byte lane per field with the
    /// input id in the top byte.
    pub fn to_id(&self, include_options: bool) -> i32 {
        let options = if include_options {
            self.options.code() as u32
        } else {
            0
        };
        (((self.input_id as u32) << 24)
            | ((self.control_type.code() as u32) << 16)
            | ((self.control_index as u32) << 8)
            | options) as i32
    }

    pub fn from_id(id: i32) -> Option<Self> {
        if id == DEFAULT_ID {
            return None;
        }
        let raw = id as u32;
        let control_type = PhysicalControlType::from_code(((raw >> 16) & 0xFF) as u8)?;
        let options = ControlOption::from_code((raw & 0xFF) as u8)?;
        Some(Self {
            input_id: (raw >> 24) as u8,
            control_type,
            control_index: ((raw >> 8) & 0xFF) as u8,
            options,
        })
    }
}
