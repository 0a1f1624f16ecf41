// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Stapeldruck batch printer.
//
// The serde representation of the settings enums and of `TaskStatus` is the
// localized label shown in the UI.  The history file stores exactly these
// strings, so changing a label is a breaking change for existing history.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StapeldruckError;

/// File extensions (lowercase, without the dot) offered for printing.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "txt", "jpg", "jpeg", "png",
];

/// Whether `ext` (with or without a leading dot, any case) is printable.
pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

/// Unique identifier for a print task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier the OS spooler assigned to one submitted raw job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpoolJobId(pub u32);

impl fmt::Display for SpoolJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Paper sizes the device-mode mapping knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    B5,
    Letter,
    Legal,
}

impl PaperSize {
    pub const ALL: [PaperSize; 5] = [Self::A4, Self::A3, Self::B5, Self::Letter, Self::Legal];

    pub fn label(&self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::A3 => "A3",
            Self::B5 => "B5",
            Self::Letter => "Letter",
            Self::Legal => "Legal",
        }
    }
}

impl FromStr for PaperSize {
    type Err = StapeldruckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StapeldruckError::InvalidSetting(format!("unknown paper size '{s}'")))
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "纵向", alias = "portrait")]
    Portrait,
    #[serde(rename = "横向", alias = "landscape")]
    Landscape,
}

impl Orientation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Portrait => "纵向",
            Self::Landscape => "横向",
        }
    }
}

impl FromStr for Orientation {
    type Err = StapeldruckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" | "纵向" => Ok(Self::Portrait),
            "landscape" | "横向" => Ok(Self::Landscape),
            _ => Err(StapeldruckError::InvalidSetting(format!(
                "unknown orientation '{s}'"
            ))),
        }
    }
}

/// Colour or black-and-white output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorMode {
    #[serde(rename = "彩色", alias = "color")]
    Color,
    #[serde(rename = "黑白", alias = "monochrome")]
    Monochrome,
}

impl ColorMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Color => "彩色",
            Self::Monochrome => "黑白",
        }
    }
}

impl FromStr for ColorMode {
    type Err = StapeldruckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "color" | "colour" | "彩色" => Ok(Self::Color),
            "mono" | "monochrome" | "bw" | "黑白" => Ok(Self::Monochrome),
            _ => Err(StapeldruckError::InvalidSetting(format!(
                "unknown color mode '{s}'"
            ))),
        }
    }
}

/// Duplex printing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DuplexMode {
    #[serde(rename = "单面", alias = "simplex")]
    Simplex,
    /// Flip on the long edge (book binding).
    #[serde(rename = "双面长边", alias = "long-edge")]
    LongEdge,
    /// Flip on the short edge (notepad binding).
    #[serde(rename = "双面短边", alias = "short-edge")]
    ShortEdge,
}

impl DuplexMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Simplex => "单面",
            Self::LongEdge => "双面长边",
            Self::ShortEdge => "双面短边",
        }
    }
}

impl FromStr for DuplexMode {
    type Err = StapeldruckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simplex" | "one-sided" | "单面" => Ok(Self::Simplex),
            "long-edge" | "duplex" | "双面长边" => Ok(Self::LongEdge),
            "short-edge" | "双面短边" => Ok(Self::ShortEdge),
            _ => Err(StapeldruckError::InvalidSetting(format!(
                "unknown duplex mode '{s}'"
            ))),
        }
    }
}

/// How one file should be printed.
///
/// `page_range` is free text such as `"1-3,5,7-9"`; an empty string means
/// all pages.  It is carried through to history untouched and never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintSettings {
    pub paper_size: PaperSize,
    pub orientation: Orientation,
    #[serde(default)]
    pub page_range: String,
    pub color_mode: ColorMode,
    #[serde(rename = "sides_option")]
    pub duplex: DuplexMode,
    pub copies: u32,
}

impl PrintSettings {
    /// Reject settings the spooler loop cannot honour.
    pub fn validate(&self) -> Result<(), StapeldruckError> {
        if self.copies == 0 {
            return Err(StapeldruckError::InvalidSetting(
                "copies must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            orientation: Orientation::Portrait,
            page_range: String::new(),
            color_mode: ColorMode::Color,
            duplex: DuplexMode::Simplex,
            copies: 1,
        }
    }
}

/// Lifecycle states of a print task.
///
/// `Waiting -> Printing -> {Completed, Failed, Cancelled}`, with
/// `Printing <-> Paused` in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "等待打印")]
    Waiting,
    #[serde(rename = "正在打印")]
    Printing,
    #[serde(rename = "已暂停")]
    Paused,
    #[serde(rename = "已完成")]
    Completed,
    #[serde(rename = "打印失败")]
    Failed,
    #[serde(rename = "已取消")]
    Cancelled,
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Waiting => "等待打印",
            Self::Printing => "正在打印",
            Self::Paused => "已暂停",
            Self::Completed => "已完成",
            Self::Failed => "打印失败",
            Self::Cancelled => "已取消",
        }
    }

    /// Completed, Failed and Cancelled admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Win32 PRINTER_STATUS_* bits we classify.
pub const PRINTER_STATUS_PAUSED: u32 = 0x0000_0001;
pub const PRINTER_STATUS_ERROR: u32 = 0x0000_0002;
pub const PRINTER_STATUS_PAPER_JAM: u32 = 0x0000_0008;
pub const PRINTER_STATUS_PAPER_OUT: u32 = 0x0000_0010;
pub const PRINTER_STATUS_PAPER_PROBLEM: u32 = 0x0000_0040;
pub const PRINTER_STATUS_OFFLINE: u32 = 0x0000_0080;
pub const PRINTER_STATUS_OUTPUT_BIN_FULL: u32 = 0x0000_0800;
pub const PRINTER_STATUS_NO_TONER: u32 = 0x0004_0000;
pub const PRINTER_STATUS_DOOR_OPEN: u32 = 0x0040_0000;

const ERROR_BITS: u32 = PRINTER_STATUS_ERROR
    | PRINTER_STATUS_OFFLINE
    | PRINTER_STATUS_NO_TONER
    | PRINTER_STATUS_DOOR_OPEN;

const WARNING_BITS: u32 = PRINTER_STATUS_PAPER_JAM
    | PRINTER_STATUS_PAPER_OUT
    | PRINTER_STATUS_PAPER_PROBLEM
    | PRINTER_STATUS_OUTPUT_BIN_FULL;

/// Coarse printer condition derived from the raw status bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrinterState {
    Ready,
    Paused,
    /// Error, offline, out of toner or door open.
    Error,
    /// Jam, out of paper, paper problem or output bin full.
    Warning,
    Unknown,
}

impl PrinterState {
    pub fn from_status_bits(status: u32) -> Self {
        if status == 0 {
            Self::Ready
        } else if status & ERROR_BITS != 0 {
            Self::Error
        } else if status & WARNING_BITS != 0 {
            Self::Warning
        } else if status & PRINTER_STATUS_PAUSED != 0 {
            Self::Paused
        } else {
            Self::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Paused => "paused",
            Self::Error => "error",
            Self::Warning => "needs attention",
            Self::Unknown => "unknown",
        }
    }
}

/// A printer as reported by the OS.  Observed only, never owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterDescriptor {
    pub name: String,
    /// Raw PRINTER_STATUS_* bit field.
    pub status: u32,
}

impl PrinterDescriptor {
    pub fn new(name: impl Into<String>, status: u32) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }

    pub fn state(&self) -> PrinterState {
        PrinterState::from_status_bits(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_localized_label() {
        let json = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(json, "\"已完成\"");
        let back: TaskStatus = serde_json::from_str("\"打印失败\"").unwrap();
        assert_eq!(back, TaskStatus::Failed);
    }

    #[test]
    fn terminal_states() {
        assert!(!TaskStatus::Waiting.is_terminal());
        assert!(!TaskStatus::Printing.is_terminal());
        assert!(!TaskStatus::Paused.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn settings_use_history_field_names() {
        let settings = PrintSettings {
            duplex: DuplexMode::LongEdge,
            color_mode: ColorMode::Monochrome,
            copies: 2,
            ..Default::default()
        };
        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["sides_option"], "双面长边");
        assert_eq!(value["color_mode"], "黑白");
        assert_eq!(value["orientation"], "纵向");
        assert_eq!(value["paper_size"], "A4");
        assert_eq!(value["copies"], 2);
    }

    #[test]
    fn settings_accept_ascii_aliases() {
        let json = r#"{"paper_size":"Letter","orientation":"landscape","page_range":"1-3",
                       "color_mode":"monochrome","sides_option":"short-edge","copies":1}"#;
        let settings: PrintSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.paper_size, PaperSize::Letter);
        assert_eq!(settings.orientation, Orientation::Landscape);
        assert_eq!(settings.duplex, DuplexMode::ShortEdge);
    }

    #[test]
    fn parse_cli_keywords() {
        assert_eq!("a3".parse::<PaperSize>().unwrap(), PaperSize::A3);
        assert_eq!("Landscape".parse::<Orientation>().unwrap(), Orientation::Landscape);
        assert_eq!("mono".parse::<ColorMode>().unwrap(), ColorMode::Monochrome);
        assert_eq!("双面短边".parse::<DuplexMode>().unwrap(), DuplexMode::ShortEdge);
        assert!("A0".parse::<PaperSize>().is_err());
    }

    #[test]
    fn zero_copies_rejected() {
        let settings = PrintSettings {
            copies: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(StapeldruckError::InvalidSetting(_))
        ));
    }

    #[test]
    fn printer_state_classification() {
        assert_eq!(PrinterState::from_status_bits(0), PrinterState::Ready);
        assert_eq!(
            PrinterState::from_status_bits(PRINTER_STATUS_OFFLINE),
            PrinterState::Error
        );
        assert_eq!(
            PrinterState::from_status_bits(PRINTER_STATUS_PAPER_OUT),
            PrinterState::Warning
        );
        assert_eq!(
            PrinterState::from_status_bits(PRINTER_STATUS_PAUSED),
            PrinterState::Paused
        );
        // Error wins over warning and paused.
        assert_eq!(
            PrinterState::from_status_bits(
                PRINTER_STATUS_PAUSED | PRINTER_STATUS_PAPER_JAM | PRINTER_STATUS_DOOR_OPEN
            ),
            PrinterState::Error
        );
        assert_eq!(PrinterState::from_status_bits(0x0200), PrinterState::Unknown);
    }

    #[test]
    fn extension_allow_list() {
        assert!(is_supported_extension("PDF"));
        assert!(is_supported_extension(".jpeg"));
        assert!(!is_supported_extension("exe"));
        assert!(!is_supported_extension(""));
    }
}
