use thiserror::Error;

/// Failures surfaced to the host. Nothing inside a step can produce one of
/// these; stepping is panic-free and infallible.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("rom image is {0} bytes, shorter than the 0x150-byte header")]
    RomTooShort(usize),
    #[error("unsupported cartridge type 0x{0:02x}")]
    UnsupportedCartridgeType(u8),
    #[error("save state magic byte invalid")]
    SaveStateMagicInvalid,
    #[error("save state version {0} unsupported")]
    SaveStateVersionUnsupported(u8),
    #[error("save state checksum mismatch")]
    SaveStateChecksumMismatch,
    #[error("save state was taken from a different rom")]
    SaveStateIncompatibleWithRom,
    #[error("save state payload is malformed")]
    SaveStateMalformedJson,
    #[error("battery ram snapshot is {got} bytes, cartridge declares {declared}")]
    InvalidBatteryRamSize { got: usize, declared: usize },
}
