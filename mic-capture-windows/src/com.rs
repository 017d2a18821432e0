use windows::Win32::System::Com::*;

use mic_capture_core::CaptureError;

/// COM apartment for the current thread, released on drop.
pub(crate) struct ComApartment;

impl ComApartment {
    pub(crate) fn enter() -> Result<Self, CaptureError> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(|e| CaptureError::Unknown(format!("CoInitializeEx failed: {}", e)))?;
        }
        Ok(ComApartment)
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}
