//! Machine model: word width and endianness of the program under analysis.
//!
//! Set once at startup before any IR is built; read-only afterwards
//! (single-writer, multi-reader, like the type pool).

use lazy_static::lazy_static;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineModel {
    /// Pointer / word width in bits: 16, 32 or 64.
    pub word_width: u32,
    pub endianness: Endianness,
}

impl Default for MachineModel {
    fn default() -> Self {
        MachineModel { word_width: 64, endianness: Endianness::Little }
    }
}

lazy_static! {
    static ref MODEL: RwLock<MachineModel> = RwLock::new(MachineModel::default());
}

pub fn set_machine_model(model: MachineModel) {
    assert!(
        matches!(model.word_width, 16 | 32 | 64),
        "internal error: unsupported machine word width {}",
        model.word_width
    );
    *MODEL.write().unwrap() = model;
}

pub fn machine_model() -> MachineModel {
    *MODEL.read().unwrap()
}
