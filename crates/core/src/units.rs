//! Length conversions between points, inches, centimetres and EMU.

/// English Metric Units, the native length of presentation documents.
pub type Emu = i64;

pub const EMU_PER_INCH: i64 = 914_400;
pub const EMU_PER_CM: i64 = 360_000;
pub const EMU_PER_PT: i64 = 12_700;

pub fn pt_to_emu(pt: f64) -> Emu {
    (pt * EMU_PER_PT as f64).round() as Emu
}

pub fn emu_to_pt(emu: Emu) -> f64 {
    emu as f64 / EMU_PER_PT as f64
}

pub fn inches_to_emu(inches: f64) -> Emu {
    (inches * EMU_PER_INCH as f64).round() as Emu
}

pub fn emu_to_inches(emu: Emu) -> f64 {
    emu as f64 / EMU_PER_INCH as f64
}

pub fn cm_to_emu(cm: f64) -> Emu {
    (cm * EMU_PER_CM as f64).round() as Emu
}

pub fn emu_to_cm(emu: Emu) -> f64 {
    emu as f64 / EMU_PER_CM as f64
}
