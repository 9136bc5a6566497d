// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scanwerk_core::{EnhancementMode, Point};

/// Straighten and clean up photographed documents.
#[derive(Parser, Debug)]
#[command(name = "scanwerk")]
#[command(version)]
#[command(about = "Detect, straighten and enhance photographed documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan image files into rectified, enhanced PNGs
    Scan(ScanArgs),
    /// Print the effective configuration as JSON
    Config(ConfigArgs),
    /// List archived documents, newest first
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
    /// Images to scan (JPEG, PNG, TIFF, ...)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Directory to write `<name>_scanned.png` files into
    #[arg(short, long)]
    pub out: PathBuf,

    /// Enhancement: original, enhanced, grayscale or bw
    #[arg(short, long)]
    pub mode: Option<EnhancementMode>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also store each result in the archive at this directory
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Corners to use instead of the detected ones, as x,y,x,y,x,y,x,y in
    /// any order. Applied to every file.
    #[arg(long, value_parser = parse_corners)]
    pub corners: Option<[Point; 4]>,
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// JSON configuration file to validate and expand
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Archive directory
    #[arg(long)]
    pub archive: PathBuf,

    /// Print full metadata as JSON
    #[arg(long)]
    pub json: bool,
}

/// Parse `x,y,x,y,x,y,x,y` into four points.
pub fn parse_corners(value: &str) -> Result<[Point; 4], String> {
    let numbers = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|_| format!("{:?} is not a number", part.trim()))
        })
        .collect::<Result<Vec<f32>, String>>()?;

    if numbers.len() != 8 {
        return Err(format!(
            "expected 8 comma-separated numbers (4 x,y pairs), got {}",
            numbers.len()
        ));
    }
    if let Some(bad) = numbers.iter().find(|n| !n.is_finite()) {
        return Err(format!("{bad} is not a finite coordinate"));
    }
    Ok([
        Point::new(numbers[0], numbers[1]),
        Point::new(numbers[2], numbers[3]),
        Point::new(numbers[4], numbers[5]),
        Point::new(numbers[6], numbers[7]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn corners_parse_in_pairs() {
        let corners = parse_corners("10,20, 300,20,300,400 ,10,400").expect("parse");
        assert_eq!(corners[0], Point::new(10.0, 20.0));
        assert_eq!(corners[3], Point::new(10.0, 400.0));
    }

    #[test]
    fn corners_need_eight_numbers() {
        assert!(parse_corners("1,2,3,4,5,6").is_err());
        assert!(parse_corners("1,2,3,4,5,6,7,x").is_err());
        assert!(parse_corners("1,2,3,4,5,6,7,inf").is_err());
    }

    #[test]
    fn scan_arguments() {
        let cli = Cli::try_parse_from([
            "scanwerk", "scan", "a.jpg", "b.png", "--out", "out", "--mode", "bw", "--corners",
            "0,0,9,0,9,9,0,9",
        ])
        .expect("parse");
        let Commands::Scan(args) = cli.command else {
            panic!("expected the scan command");
        };
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.mode, Some(EnhancementMode::Bw));
        assert!(args.corners.is_some());
        assert!(args.archive.is_none());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let result = Cli::try_parse_from(["scanwerk", "scan", "a.jpg", "--out", "o", "--mode", "sepia"]);
        assert!(result.is_err());
    }

    #[test]
    fn scan_requires_files() {
        assert!(Cli::try_parse_from(["scanwerk", "scan", "--out", "o"]).is_err());
    }
}
