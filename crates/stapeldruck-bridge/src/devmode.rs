// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device-mode field mapping.
//
// Translates `PrintSettings` into the numeric DEVMODE values the Windows
// spooler expects (wingdi.h).  Kept free of any platform types so it can be
// tested everywhere.

use stapeldruck_core::types::{ColorMode, DuplexMode, Orientation, PaperSize, PrintSettings};

// dmFields bits.
pub const DM_ORIENTATION: u32 = 0x0000_0001;
pub const DM_PAPERSIZE: u32 = 0x0000_0002;
pub const DM_COLOR: u32 = 0x0000_0800;
pub const DM_DUPLEX: u32 = 0x0000_1000;

pub const DMPAPER_LETTER: i16 = 1;
pub const DMPAPER_LEGAL: i16 = 5;
pub const DMPAPER_A3: i16 = 8;
pub const DMPAPER_A4: i16 = 9;
pub const DMPAPER_B5: i16 = 13;

pub const DMORIENT_PORTRAIT: i16 = 1;
pub const DMORIENT_LANDSCAPE: i16 = 2;

pub const DMDUP_SIMPLEX: i16 = 1;
/// Long-edge binding.
pub const DMDUP_VERTICAL: i16 = 2;
/// Short-edge binding.
pub const DMDUP_HORIZONTAL: i16 = 3;

pub const DMCOLOR_MONOCHROME: i16 = 1;
pub const DMCOLOR_COLOR: i16 = 2;

/// The subset of DEVMODE a task overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevModeFields {
    pub paper_size: i16,
    pub orientation: i16,
    pub duplex: i16,
    pub color: i16,
    /// Bits to OR into `dmFields` so the driver honours the values above.
    pub field_mask: u32,
}

impl DevModeFields {
    pub fn from_settings(settings: &PrintSettings) -> Self {
        Self {
            paper_size: paper_code(settings.paper_size),
            orientation: match settings.orientation {
                Orientation::Portrait => DMORIENT_PORTRAIT,
                Orientation::Landscape => DMORIENT_LANDSCAPE,
            },
            duplex: match settings.duplex {
                DuplexMode::Simplex => DMDUP_SIMPLEX,
                DuplexMode::LongEdge => DMDUP_VERTICAL,
                DuplexMode::ShortEdge => DMDUP_HORIZONTAL,
            },
            color: match settings.color_mode {
                ColorMode::Color => DMCOLOR_COLOR,
                ColorMode::Monochrome => DMCOLOR_MONOCHROME,
            },
            field_mask: DM_ORIENTATION | DM_PAPERSIZE | DM_COLOR | DM_DUPLEX,
        }
    }
}

fn paper_code(paper: PaperSize) -> i16 {
    match paper {
        PaperSize::A4 => DMPAPER_A4,
        PaperSize::A3 => DMPAPER_A3,
        PaperSize::B5 => DMPAPER_B5,
        PaperSize::Letter => DMPAPER_LETTER,
        PaperSize::Legal => DMPAPER_LEGAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_map_to_a4_portrait_simplex_color() {
        let fields = DevModeFields::from_settings(&PrintSettings::default());
        assert_eq!(fields.paper_size, DMPAPER_A4);
        assert_eq!(fields.orientation, DMORIENT_PORTRAIT);
        assert_eq!(fields.duplex, DMDUP_SIMPLEX);
        assert_eq!(fields.color, DMCOLOR_COLOR);
        assert_eq!(fields.field_mask, 0x1803);
    }

    #[test]
    fn duplex_edges_map_to_binding_direction() {
        let long = PrintSettings {
            duplex: DuplexMode::LongEdge,
            ..Default::default()
        };
        let short = PrintSettings {
            duplex: DuplexMode::ShortEdge,
            ..Default::default()
        };
        assert_eq!(DevModeFields::from_settings(&long).duplex, DMDUP_VERTICAL);
        assert_eq!(DevModeFields::from_settings(&short).duplex, DMDUP_HORIZONTAL);
    }

    #[test]
    fn every_paper_size_has_a_code() {
        let codes: Vec<i16> = PaperSize::ALL.iter().map(|p| paper_code(*p)).collect();
        assert_eq!(codes, vec![9, 8, 13, 1, 5]);
    }

    #[test]
    fn monochrome_landscape() {
        let settings = PrintSettings {
            orientation: Orientation::Landscape,
            color_mode: ColorMode::Monochrome,
            ..Default::default()
        };
        let fields = DevModeFields::from_settings(&settings);
        assert_eq!(fields.orientation, DMORIENT_LANDSCAPE);
        assert_eq!(fields.color, DMCOLOR_MONOCHROME);
    }
}
