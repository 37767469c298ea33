//! Flash storage for tuning tables and calibration constants (SPEC_FULL.md 4.12), mirroring
//! the teacher's `cfg_storage.rs` flash-sector save/load for `UserCfg`.

use gx35_core::config::TuningConfig;
use hal::flash::{Bank, Flash};

#[cfg(feature = "h7")]
const FLASH_CFG_SECTOR: u8 = 7;
#[cfg(feature = "g4")]
const FLASH_CFG_PAGE: usize = 63;

/// Loads VE/SA tables and calibration constants from the config flash sector. The on-flash
/// layout (axis counts, grid floats, calibration coefficients) is a board-bringup detail out
/// of scope for this core; until that encoding is finalized this returns the compiled-in
/// defaults, same as the teacher's own `cfg_storage.rs` (`UserCfg::load` is left unwritten
/// there too).
pub fn load_tuning_from_flash(_flash: &mut Flash) -> TuningConfig {
    TuningConfig::defaults()
}

/// Placeholder save path, kept in the same shape as `load_tuning_from_flash` above so the
/// encoding can be filled in without touching call sites.
pub fn save_to_flash(_cfg: &TuningConfig, flash: &mut Flash) {
    let data = [0u8; 256];

    #[cfg(feature = "h7")]
    flash.erase_write_sector(Bank::B1, FLASH_CFG_SECTOR, &data).ok();
    #[cfg(feature = "g4")]
    flash.erase_write_page(Bank::B1, FLASH_CFG_PAGE, &data).ok();
}
