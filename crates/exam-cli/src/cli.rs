//! Command-line definition for `exf`.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "exf", about = "examflow admin toolbox", version)]
pub struct Cli {
    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Silence all non-error log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Resolve a subject code to its Moodle assignment
    Resolve {
        /// Subject code, e.g. 19AI405 (case-insensitive)
        subject_code: String,
        /// Moodle token enabling live discovery
        #[arg(long)]
        token: Option<String>,
    },

    /// Inspect and manage stored subject mappings
    Mappings {
        #[command(subcommand)]
        action: MappingsAction,
    },

    /// Inspect and manage the resolution cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Re-discover every active mapping and update the changed ones
    Refresh {
        /// Moodle token with access to the mapped courses
        #[arg(long)]
        token: String,
    },

    /// Register a scanned paper (staff upload)
    Upload {
        /// Path to the scanned file, named REGISTERNO_SUBJECTCODE.ext
        file: PathBuf,
        /// Directory to store the blob in
        #[arg(long, default_value = "uploads")]
        blob_dir: PathBuf,
    },

    /// Submit an uploaded paper to Moodle on the student's behalf
    Submit {
        /// Artifact uid from the upload step
        artifact_uid: String,
        /// The student's Moodle token
        #[arg(long)]
        token: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum MappingsAction {
    /// List all active mappings
    List,
    /// Soft-deactivate a mapping (the row is kept)
    Deactivate { subject_code: String },
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show hit/miss statistics
    Stats,
    /// Drop every cached mapping
    Clear,
}
