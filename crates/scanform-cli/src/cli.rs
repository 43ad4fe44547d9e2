//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scanform::{EngineType, LogFormat, ProcessingStatus, SortDirection, SortField};

#[derive(Parser)]
#[command(name = "scanform")]
#[command(about = "Turn scanned forms into structured JSON")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/.scanform/config.json when present)
    #[arg(short, long, global = true, env = "SCANFORM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format: pretty or json
    #[arg(long, global = true, default_value = "pretty", env = "SCANFORM_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a PNG, JPEG or PDF as a new pending document
    Upload {
        file: PathBuf,
        /// MIME type; guessed from the extension when omitted
        #[arg(short = 't', long)]
        content_type: Option<String>,
        /// Start processing right after the upload and wait for it
        #[arg(short, long)]
        process: bool,
    },

    /// Process one document and wait for the result
    Process {
        id: String,
        /// Force an OCR engine (local/tesseract or remote/google_vision)
        #[arg(short, long)]
        engine: Option<EngineType>,
    },

    /// Process several documents concurrently
    Batch {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show a document and its field mappings
    Show {
        id: String,
        /// Include the extracted text
        #[arg(long)]
        text: bool,
    },

    /// List documents
    List {
        /// Only documents with this status
        #[arg(short, long)]
        status: Option<ProcessingStatus>,
        #[arg(short, long, default_value = "0")]
        page: u32,
        #[arg(long, default_value = "20")]
        size: u32,
        /// created_at, updated_at, original_filename, status or id
        #[arg(long, default_value = "created_at")]
        sort: SortField,
        #[arg(long, default_value = "desc")]
        direction: SortDirection,
    },

    /// Find documents whose original filename contains a fragment
    Search { fragment: String },

    /// Replace a document's structured data with corrected JSON
    Correct {
        id: String,
        /// Corrected JSON; read from --file when omitted
        json: Option<String>,
        #[arg(short, long, conflicts_with = "json")]
        file: Option<PathBuf>,
    },

    /// Print extracted JSON with any correction applied
    Merged { id: String },

    /// Show OCR engines and their availability
    Engines,

    /// Show or change OCR languages
    Languages {
        /// New primary ISO 639-1 code
        #[arg(long)]
        set: Option<String>,
        /// Additional ISO codes, used with --set
        #[arg(long, value_delimiter = ',', requires = "set")]
        also: Vec<String>,
    },

    /// Document counts per status
    Stats,
}
