// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use stapeldruck_core::types::{ColorMode, DuplexMode, Orientation, PaperSize, PrintSettings};
use stapeldruck_print::SortOrder;

/// Stapeldruck command line
#[derive(Parser, Debug)]
#[command(
    name = "stapeldruck",
    version,
    about = "Batch print the files in a folder through the OS print spooler."
)]
pub struct Cli {
    /// Directory holding config.json and the print history
    /// (default: $STAPELDRUCK_DATA_DIR or the platform data directory)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log debug detail (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List printers and their current state
    Printers {
        /// Keep polling and report state changes until Ctrl-C
        #[arg(long)]
        watch: bool,
    },

    /// List the printable files in a folder
    List {
        folder: PathBuf,

        /// name-asc, name-desc, type-asc, type-desc, size-asc or size-desc
        #[arg(long, default_value = "name-asc")]
        sort: SortOrder,

        /// Only show files whose name contains this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Print files from a folder, one task per file
    Print(PrintArgs),

    /// Show finished print tasks
    History {
        /// Forget all finished tasks
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Args, Debug)]
pub struct PrintArgs {
    /// Folder holding the files
    pub folder: PathBuf,

    /// File names inside the folder to print
    pub files: Vec<String>,

    /// Print every printable file in the folder
    #[arg(long, conflicts_with = "files")]
    pub all: bool,

    /// Order in which --all files are queued
    #[arg(long, default_value = "name-asc")]
    pub sort: SortOrder,

    /// Target printer (default: config default_printer, then the OS default)
    #[arg(long)]
    pub printer: Option<String>,

    /// A4, A3, B5, Letter or Legal
    #[arg(long)]
    pub paper: Option<PaperSize>,

    /// portrait or landscape
    #[arg(long)]
    pub orientation: Option<Orientation>,

    /// color or mono
    #[arg(long)]
    pub color: Option<ColorMode>,

    /// simplex, long-edge or short-edge
    #[arg(long)]
    pub duplex: Option<DuplexMode>,

    #[arg(long)]
    pub copies: Option<u32>,

    /// Page range such as 1-3,5 (passed through with the task)
    #[arg(long)]
    pub pages: Option<String>,

    /// Record jobs in memory instead of sending them to the spooler
    #[arg(long)]
    pub dry_run: bool,

    /// Store the printer and settings used as the new defaults
    #[arg(long)]
    pub remember: bool,
}

impl PrintArgs {
    /// `base` with every option given on the command line applied.
    pub fn settings(&self, base: &PrintSettings) -> PrintSettings {
        let mut settings = base.clone();
        if let Some(paper) = self.paper {
            settings.paper_size = paper;
        }
        if let Some(orientation) = self.orientation {
            settings.orientation = orientation;
        }
        if let Some(color) = self.color {
            settings.color_mode = color;
        }
        if let Some(duplex) = self.duplex {
            settings.duplex = duplex;
        }
        if let Some(copies) = self.copies {
            settings.copies = copies;
        }
        if let Some(pages) = &self.pages {
            settings.page_range = pages.clone();
        }
        settings
    }
}
