// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Windows print spooler backend (winspool.drv via `windows-sys`).
//
// Raw job sequence per copy:
//   OpenPrinter -> StartDocPrinter("RAW") -> StartPagePrinter ->
//   WritePrinter -> EndPagePrinter -> EndDocPrinter -> ClosePrinter
//
// The handle is closed on every path by `PrinterHandle`'s Drop.

use std::ffi::c_void;
use std::io;
use std::ptr;

use tracing::{debug, info, instrument, warn};
use windows_sys::Win32::Graphics::Printing::{
    ClosePrinter, DOC_INFO_1W, EndDocPrinter, EndPagePrinter, EnumPrintersW, GetDefaultPrinterW,
    GetPrinterW, OpenPrinterW, PRINTER_DEFAULTSW, PRINTER_INFO_2W, SetDefaultPrinterW,
    SetPrinterW, StartDocPrinterW, StartPagePrinter, WritePrinter,
};

use stapeldruck_core::error::{Result, StapeldruckError};
use stapeldruck_core::types::{PrintSettings, PrinterDescriptor, SpoolJobId};

use crate::devmode::DevModeFields;
use crate::traits::PrinterSubsystem;

const PRINTER_ENUM_LOCAL: u32 = 0x0000_0002;
const PRINTER_ENUM_CONNECTIONS: u32 = 0x0000_0004;
const PRINTER_ALL_ACCESS: u32 = 0x000F_000C;

/// WritePrinter takes a u32 length; large files go through in slices.
const WRITE_CHUNK: usize = 1 << 20;

/// `PrinterSubsystem` backed by the Windows spooler.
pub struct WinSpooler;

impl WinSpooler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WinSpooler {
    fn default() -> Self {
        Self::new()
    }
}

impl PrinterSubsystem for WinSpooler {
    fn platform_name(&self) -> &str {
        "Windows spooler"
    }

    #[instrument(skip(self))]
    fn list_printers(&self) -> Result<Vec<PrinterDescriptor>> {
        let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
        let mut needed = 0u32;
        let mut returned = 0u32;

        // First call only sizes the buffer and is expected to fail.
        unsafe {
            EnumPrintersW(flags, ptr::null(), 2, ptr::null_mut(), 0, &mut needed, &mut returned);
        }
        if needed == 0 {
            return Ok(Vec::new());
        }

        let mut buf = aligned_buffer(needed);
        let ok = unsafe {
            EnumPrintersW(
                flags,
                ptr::null(),
                2,
                buf.as_mut_ptr().cast::<u8>(),
                needed,
                &mut needed,
                &mut returned,
            )
        };
        if ok == 0 {
            return Err(os_error("EnumPrinters", "local"));
        }

        let infos = unsafe {
            std::slice::from_raw_parts(buf.as_ptr().cast::<PRINTER_INFO_2W>(), returned as usize)
        };
        let printers: Vec<PrinterDescriptor> = infos
            .iter()
            .map(|info| PrinterDescriptor::new(unsafe { from_wide(info.pPrinterName) }, info.Status))
            .collect();

        debug!(count = printers.len(), "printers enumerated");
        Ok(printers)
    }

    fn default_printer(&self) -> Result<Option<String>> {
        let mut len = 0u32;
        unsafe {
            GetDefaultPrinterW(ptr::null_mut(), &mut len);
        }
        if len == 0 {
            return Ok(None);
        }

        let mut buf = vec![0u16; len as usize];
        let ok = unsafe { GetDefaultPrinterW(buf.as_mut_ptr(), &mut len) };
        if ok == 0 {
            return Err(os_error("GetDefaultPrinter", ""));
        }
        Ok(Some(unsafe { from_wide(buf.as_ptr()) }))
    }

    #[instrument(skip(self, settings), fields(paper = settings.paper_size.label()))]
    fn apply_settings(&self, printer: &str, settings: &PrintSettings) -> Result<()> {
        let name = wide(printer);
        if unsafe { SetDefaultPrinterW(name.as_ptr()) } == 0 {
            warn!(printer, error = %io::Error::last_os_error(), "SetDefaultPrinter failed");
        }

        // Changing the stored device mode needs full access; without admin
        // rights fall back to a use-only handle and let SetPrinter fail.
        let handle = match PrinterHandle::open_with_access(printer, PRINTER_ALL_ACCESS) {
            Ok(h) => h,
            Err(_) => PrinterHandle::open(printer)?,
        };

        let mut buf = handle.info_2()?;
        let info = buf.as_mut_ptr().cast::<PRINTER_INFO_2W>();
        let fields = DevModeFields::from_settings(settings);

        unsafe {
            let devmode = (*info).pDevMode;
            if devmode.is_null() {
                warn!(printer, "printer has no device mode; using driver defaults");
                return Ok(());
            }
            (*devmode).dmFields |= fields.field_mask;
            (*devmode).Anonymous1.Anonymous1.dmPaperSize = fields.paper_size;
            (*devmode).Anonymous1.Anonymous1.dmOrientation = fields.orientation;
            (*devmode).dmDuplex = fields.duplex;
            (*devmode).dmColor = fields.color;
            // Leave the security descriptor untouched.
            (*info).pSecurityDescriptor = ptr::null_mut();
        }

        let ok = unsafe { SetPrinterW(handle.raw, 2, buf.as_mut_ptr().cast::<u8>(), 0) };
        if ok == 0 {
            warn!(
                printer,
                error = %io::Error::last_os_error(),
                "SetPrinter failed; printing with the printer's current settings"
            );
        } else {
            debug!(printer, "device mode updated");
        }
        Ok(())
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    fn submit_job(&self, printer: &str, data: &[u8], job_name: &str) -> Result<SpoolJobId> {
        let handle = PrinterHandle::open(printer)?;

        let mut doc_name = wide(job_name);
        let mut datatype = wide("RAW");
        let mut doc_info = DOC_INFO_1W {
            pDocName: doc_name.as_mut_ptr(),
            pOutputFile: ptr::null_mut(),
            pDatatype: datatype.as_mut_ptr(),
        };

        let job = unsafe { StartDocPrinterW(handle.raw, 1, &mut doc_info) };
        if job == 0 {
            return Err(os_error("StartDocPrinter", printer));
        }

        let written = write_document(&handle, printer, data);
        let ended = unsafe { EndDocPrinter(handle.raw) };
        written?;
        if ended == 0 {
            return Err(os_error("EndDocPrinter", printer));
        }

        info!(printer, job_name, job_id = job, "raw job spooled");
        Ok(SpoolJobId(job))
    }
}

/// StartPage / Write / EndPage.  The caller always ends the document.
fn write_document(handle: &PrinterHandle, printer: &str, data: &[u8]) -> Result<()> {
    if unsafe { StartPagePrinter(handle.raw) } == 0 {
        return Err(os_error("StartPagePrinter", printer));
    }

    for chunk in data.chunks(WRITE_CHUNK) {
        let mut done = 0u32;
        let ok = unsafe {
            WritePrinter(
                handle.raw,
                chunk.as_ptr().cast::<c_void>(),
                chunk.len() as u32,
                &mut done,
            )
        };
        if ok == 0 || done as usize != chunk.len() {
            return Err(os_error("WritePrinter", printer));
        }
    }

    if unsafe { EndPagePrinter(handle.raw) } == 0 {
        return Err(os_error("EndPagePrinter", printer));
    }
    Ok(())
}

/// Open printer handle, closed on drop.
struct PrinterHandle {
    raw: *mut c_void,
}

impl PrinterHandle {
    fn open(name: &str) -> Result<Self> {
        Self::open_inner(name, None)
    }

    fn open_with_access(name: &str, access: u32) -> Result<Self> {
        Self::open_inner(name, Some(access))
    }

    fn open_inner(name: &str, access: Option<u32>) -> Result<Self> {
        let wide_name = wide(name);
        let mut raw: *mut c_void = ptr::null_mut();
        let defaults = access.map(|desired| PRINTER_DEFAULTSW {
            pDatatype: ptr::null_mut(),
            pDevMode: ptr::null_mut(),
            DesiredAccess: desired,
        });
        let defaults_ptr = defaults
            .as_ref()
            .map_or(ptr::null(), |d| d as *const PRINTER_DEFAULTSW);

        let ok = unsafe { OpenPrinterW(wide_name.as_ptr(), &mut raw, defaults_ptr) };
        if ok == 0 {
            return Err(os_error("OpenPrinter", name));
        }
        Ok(Self { raw })
    }

    /// PRINTER_INFO_2 for this printer in an 8-byte aligned buffer.
    fn info_2(&self) -> Result<Vec<u64>> {
        let mut needed = 0u32;
        unsafe {
            GetPrinterW(self.raw, 2, ptr::null_mut(), 0, &mut needed);
        }
        if needed == 0 {
            return Err(os_error("GetPrinter", "level 2"));
        }

        let mut buf = aligned_buffer(needed);
        let ok = unsafe {
            GetPrinterW(self.raw, 2, buf.as_mut_ptr().cast::<u8>(), needed, &mut needed)
        };
        if ok == 0 {
            return Err(os_error("GetPrinter", "level 2"));
        }
        Ok(buf)
    }
}

impl Drop for PrinterHandle {
    fn drop(&mut self) {
        unsafe {
            ClosePrinter(self.raw);
        }
    }
}

fn aligned_buffer(bytes: u32) -> Vec<u64> {
    vec![0u64; (bytes as usize).div_ceil(8)]
}

fn os_error(step: &str, printer: &str) -> StapeldruckError {
    StapeldruckError::Spooler(format!(
        "{step} ({printer}): {}",
        io::Error::last_os_error()
    ))
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Read a NUL-terminated UTF-16 string.
unsafe fn from_wide(p: *const u16) -> String {
    if p.is_null() {
        return String::new();
    }
    unsafe {
        let mut len = 0usize;
        while *p.add(len) != 0 {
            len += 1;
        }
        String::from_utf16_lossy(std::slice::from_raw_parts(p, len))
    }
}
