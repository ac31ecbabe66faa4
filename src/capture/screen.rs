//! Screen region capture using GDI `BitBlt` from the desktop DC.

use std::ffi::c_void;

use image::{ImageBuffer, Rgb, RgbImage};

use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleBitmap, CreateCompatibleDC,
    DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits, ReleaseDC, SRCCOPY, SelectObject,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

use super::RegionCapturer;
use super::region::Rect;
use crate::error::{CaptureError, InvalidRegion};

/// Grabs rectangles of the virtual desktop (all monitors).
#[derive(Default)]
pub struct ScreenCapturer;

impl ScreenCapturer {
    pub fn new() -> Self {
        Self
    }
}

impl RegionCapturer for ScreenCapturer {
    fn capture(&self, rect: &Rect) -> Result<RgbImage, CaptureError> {
        rect.validate()?;
        check_virtual_screen(rect)?;
        unsafe { blit_region(rect) }
    }
}

/// Rejects rectangles outside the virtual desktop bounds.
fn check_virtual_screen(rect: &Rect) -> Result<(), InvalidRegion> {
    let (vx, vy, vw, vh) = unsafe {
        (
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN),
            GetSystemMetrics(SM_CYVIRTUALSCREEN),
        )
    };
    // Shift into a (0, 0)-origin surface so the generic bounds check applies.
    // Saturated coordinates always land out of bounds.
    let shifted = Rect::new(
        rect.x1.saturating_sub(vx),
        rect.y1.saturating_sub(vy),
        rect.x2.saturating_sub(vx),
        rect.y2.saturating_sub(vy),
    );
    shifted
        .validate_within(vw.max(0) as u32, vh.max(0) as u32)
        .map_err(|_| InvalidRegion::OutOfBounds {
            x1: rect.x1,
            y1: rect.y1,
            x2: rect.x2,
            y2: rect.y2,
            width: vw.max(0) as u32,
            height: vh.max(0) as u32,
        })
}

/// Copies the rectangle from the screen DC into a 32-bit top-down DIB and
/// converts BGRA rows into an RGB image.
unsafe fn blit_region(rect: &Rect) -> Result<RgbImage, CaptureError> {
    let width = rect.width() as i32;
    let height = rect.height() as i32;

    unsafe {
        let screen_dc = GetDC(HWND::default());
        if screen_dc.is_invalid() {
            return Err(CaptureError::Platform("GetDC returned null".to_string()));
        }

        let mem_dc = CreateCompatibleDC(screen_dc);
        let bitmap = CreateCompatibleBitmap(screen_dc, width, height);
        let previous = SelectObject(mem_dc, bitmap);

        let blit = BitBlt(
            mem_dc, 0, 0, width, height, screen_dc, rect.x1, rect.y1, SRCCOPY,
        );

        let mut info = BITMAPINFO {
            bmiHeader: BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: width,
                // Negative height = top-down rows
                biHeight: -height,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut bgra = vec![0u8; (width * height * 4) as usize];
        let lines = if blit.is_ok() {
            GetDIBits(
                mem_dc,
                bitmap,
                0,
                height as u32,
                Some(bgra.as_mut_ptr() as *mut c_void),
                &mut info,
                DIB_RGB_COLORS,
            )
        } else {
            0
        };

        SelectObject(mem_dc, previous);
        let _ = DeleteObject(bitmap);
        let _ = DeleteDC(mem_dc);
        ReleaseDC(HWND::default(), screen_dc);

        if let Err(e) = blit {
            return Err(CaptureError::Platform(format!("BitBlt failed: {}", e)));
        }
        if lines != height {
            return Err(CaptureError::Platform(format!(
                "GetDIBits copied {} of {} rows",
                lines, height
            )));
        }

        let img: RgbImage = ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
            let offset = ((y * width as u32 + x) * 4) as usize;
            // BGRA -> RGB
            Rgb([bgra[offset + 2], bgra[offset + 1], bgra[offset]])
        });
        Ok(img)
    }
}
