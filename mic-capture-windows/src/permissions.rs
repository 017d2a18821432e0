//! Windows microphone privacy permission check.
//!
//! On Windows 10 1803+, microphone access is controlled by the privacy
//! settings at Settings > Privacy > Microphone. Desktop apps are allowed
//! unless the user has disabled the global toggle; there is no per-app
//! consent dialog for unpackaged apps.

use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use mic_capture_core::CaptureError;

use crate::com::ComApartment;

const E_ACCESSDENIED: i32 = 0x8007_0005_u32 as i32;
const AUDCLNT_E_DEVICE_IN_USE: i32 = 0x8889_000A_u32 as i32;

/// Check if microphone access is available.
///
/// Activates an audio client on the default capture endpoint. Access
/// denied (or an exclusive holder) means the privacy toggle is off.
/// Fails with `DeviceUnavailable` when no capture endpoint exists at all.
pub fn check_microphone_permission() -> Result<bool, CaptureError> {
    let _com = ComApartment::enter()?;

    unsafe {
        let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
            .map_err(|e| CaptureError::Unknown(format!("failed to create enumerator: {}", e)))?;

        let device = match enumerator.GetDefaultAudioEndpoint(eCapture, eConsole) {
            Ok(d) => d,
            Err(_) => return Err(CaptureError::DeviceUnavailable),
        };

        let result: windows::core::Result<IAudioClient> = device.Activate(CLSCTX_ALL, None);
        match result {
            Ok(_) => Ok(true),
            Err(e) if e.code().0 == E_ACCESSDENIED || e.code().0 == AUDCLNT_E_DEVICE_IN_USE => Ok(false),
            Err(e) => {
                log::warn!("Unexpected error checking mic permission: {}", e);
                Ok(true)
            }
        }
    }
}

/// `PermissionDenied` unless the microphone may be opened.
pub fn require_microphone_permission() -> Result<(), CaptureError> {
    if check_microphone_permission()? {
        Ok(())
    } else {
        log::warn!("Microphone access is disabled in Windows privacy settings");
        Err(CaptureError::PermissionDenied)
    }
}
