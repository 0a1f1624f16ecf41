// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the operator at the print station.
//
// Operator-input mistakes (no folder, no printer, nothing ticked) are warnings
// the user fixes themselves; spooler trouble is usually transient; the rest
// cannot be fixed by trying again.

use crate::error::StapeldruckError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Printer busy or a driver hiccup; trying again may work.
    Transient,
    /// The operator must choose or fix something first.
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as the warning heading).
    pub message: String,
    /// What the operator should try next.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `StapeldruckError` into a `HumanError`.
pub fn humanize_error(err: &StapeldruckError) -> HumanError {
    match err {
        StapeldruckError::Spooler(detail) => humanize_spooler_error(detail),

        StapeldruckError::PrinterNotFound(name) => HumanError {
            message: format!("The printer \"{name}\" could not be found."),
            suggestion: "Check the printer is installed and spelled exactly as listed by `stapeldruck printers`.".into(),
            severity: Severity::ActionRequired,
        },

        StapeldruckError::NoPrinterSelected => HumanError {
            message: "No printer selected.".into(),
            suggestion: "Choose a printer with --printer, or set default_printer in the config file.".into(),
            severity: Severity::ActionRequired,
        },

        StapeldruckError::NoFolderSelected => HumanError {
            message: "No folder selected.".into(),
            suggestion: "Choose the folder that holds the files you want to print.".into(),
            severity: Severity::ActionRequired,
        },

        StapeldruckError::NothingSelected => HumanError {
            message: "Nothing selected to print.".into(),
            suggestion: "Name the files to print, or pass --all to print every supported file in the folder.".into(),
            severity: Severity::ActionRequired,
        },

        StapeldruckError::InvalidSetting(detail) => HumanError {
            message: "One of the print settings is not valid.".into(),
            suggestion: format!("Fix the setting and try again. ({detail})"),
            severity: Severity::ActionRequired,
        },

        StapeldruckError::TaskNotFound(_) => HumanError {
            message: "That print task is no longer in the queue.".into(),
            suggestion: "It has probably finished or was already cancelled.".into(),
            severity: Severity::Permanent,
        },

        StapeldruckError::History(_) | StapeldruckError::Serialization(_) => HumanError {
            message: "The print history could not be read or written.".into(),
            suggestion: "Printing still works. Check the history file is not open in another program.".into(),
            severity: Severity::Transient,
        },

        StapeldruckError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. List the folder again.".into(),
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Permission denied while reading or writing a file.".into(),
                suggestion: "Check the file permissions, or copy the file to a folder you own.".into(),
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                severity: Severity::Transient,
            },
        },

        StapeldruckError::PlatformUnavailable => HumanError {
            message: "Printing to the OS spooler isn't available on this system.".into(),
            suggestion: "Run on Windows, or use --dry-run to exercise the queue without printing.".into(),
            severity: Severity::Permanent,
        },

        StapeldruckError::WorkerStopped => HumanError {
            message: "The print worker has stopped.".into(),
            suggestion: "Restart stapeldruck and submit the files again.".into(),
            severity: Severity::Permanent,
        },
    }
}

/// Map spooler failure text onto operator advice.
fn humanize_spooler_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("access is denied") || lower.contains("access denied") {
        HumanError {
            message: "Windows refused access to the printer.".into(),
            suggestion: "Changing printer defaults can need administrator rights. Run as administrator or ask IT.".into(),
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("offline") || lower.contains("not available") {
        HumanError {
            message: "The printer is offline.".into(),
            suggestion: "Check the printer is switched on and connected, then print again.".into(),
            severity: Severity::Transient,
        }
    } else if lower.contains("invalid printer name") || lower.contains("openprinter") {
        HumanError {
            message: "The printer could not be opened.".into(),
            suggestion: "Check the printer name with `stapeldruck printers`.".into(),
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The print spooler reported a problem.".into(),
            suggestion: format!("Try again. If this keeps happening, restart the Print Spooler service. (Detail: {detail})"),
            severity: Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_errors_need_action() {
        for err in [
            StapeldruckError::NoPrinterSelected,
            StapeldruckError::NoFolderSelected,
            StapeldruckError::NothingSelected,
        ] {
            assert!(err.is_operator_error());
            assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
        }
    }

    #[test]
    fn offline_spooler_is_transient() {
        let err = StapeldruckError::Spooler("WritePrinter: printer is offline".into());
        assert_eq!(humanize_error(&err).severity, Severity::Transient);
    }

    #[test]
    fn access_denied_needs_action() {
        let err = StapeldruckError::Spooler("SetPrinter: Access is denied. (os error 5)".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("administrator"));
    }

    #[test]
    fn unknown_spooler_detail_is_kept() {
        let err = StapeldruckError::Spooler("EndDocPrinter failed (code 1804)".into());
        let human = humanize_error(&err);
        assert!(human.suggestion.contains("code 1804"));
    }

    #[test]
    fn unknown_printer_needs_action_and_history_trouble_is_transient() {
        let err = StapeldruckError::PrinterNotFound("Office HP".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.message.contains("Office HP"));

        let err = StapeldruckError::History("disk full".into());
        assert_eq!(humanize_error(&err).severity, Severity::Transient);
    }

    #[test]
    fn runtime_failures_are_permanent() {
        for err in [
            StapeldruckError::PlatformUnavailable,
            StapeldruckError::WorkerStopped,
        ] {
            assert_eq!(humanize_error(&err).severity, Severity::Permanent);
        }
    }

    #[test]
    fn missing_task_is_permanent() {
        let err = StapeldruckError::TaskNotFound("report.pdf".into());
        assert!(!err.is_operator_error());
        assert_eq!(humanize_error(&err).severity, Severity::Permanent);
    }
}
