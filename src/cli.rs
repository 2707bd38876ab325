//! Command-line interface for convert-easy.
//!
//! A thin presentation layer: every command maps onto one orchestrator or
//! store operation.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::backend::{ConversionKind, FileType};

/// On-device file conversion: text to PDF, image to text, text to speech.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a file and record it in the history
    Convert(ConvertCommand),

    /// Inspect or edit the conversion history
    #[command(subcommand)]
    History(HistoryCommand),

    /// Write a saved conversion result back to disk
    Export(ExportCommand),

    /// Show or change the conversion settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Show how much space saved results take
    Storage,
}

/// Convert a file
#[derive(Parser, Debug)]
pub struct ConvertCommand {
    /// File to convert
    pub file: PathBuf,

    /// What to convert the file into
    #[arg(short, long)]
    pub kind: KindArg,

    /// Directory for the produced file (defaults to the input's directory)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// History commands
#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List past conversions, newest first
    List {
        /// Only show conversions producing this type
        #[arg(short = 't', long = "type")]
        file_type: Option<TypeArg>,
    },

    /// Remove one entry and its saved result
    Remove {
        /// History entry id
        id: String,
    },

    /// Remove every entry
    Clear {
        /// Also delete every saved result
        #[arg(long)]
        artifacts: bool,
    },
}

/// Write a saved result to disk
#[derive(Parser, Debug)]
pub struct ExportCommand {
    /// History entry id
    pub id: String,

    /// Destination file, or a directory to keep the original name
    pub path: PathBuf,
}

/// Settings commands
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the settings in force
    Show,

    /// Restore the default settings
    Reset,

    /// Turn history saving on or off
    SetHistory {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
}

/// Conversion kinds as written on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    /// Text file to PDF
    Document,
    /// Image to text (OCR)
    TextExtraction,
    /// Text file to spoken audio
    Speech,
}

impl From<KindArg> for ConversionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Document => ConversionKind::Document,
            KindArg::TextExtraction => ConversionKind::TextExtraction,
            KindArg::Speech => ConversionKind::Speech,
        }
    }
}

/// History file types as written on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeArg {
    Pdf,
    Txt,
    Mp3,
}

impl From<TypeArg> for FileType {
    fn from(t: TypeArg) -> Self {
        match t {
            TypeArg::Pdf => FileType::Document,
            TypeArg::Txt => FileType::Text,
            TypeArg::Mp3 => FileType::Audio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("convert-easy").chain(args.iter().copied()))
            .expect("valid command line")
    }

    #[test]
    fn convert_with_kind_and_out() {
        let cli = parse(&["convert", "notes.txt", "--kind", "text-extraction", "-o", "out"]);
        let Commands::Convert(cmd) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(cmd.file, PathBuf::from("notes.txt"));
        assert_eq!(ConversionKind::from(cmd.kind), ConversionKind::TextExtraction);
        assert_eq!(cmd.out, Some(PathBuf::from("out")));
    }

    #[test]
    fn convert_requires_kind() {
        assert!(Cli::try_parse_from(["convert-easy", "convert", "notes.txt"]).is_err());
    }

    #[test]
    fn history_list_type_filter() {
        let cli = parse(&["history", "list", "--type", "mp3"]);
        match cli.command {
            Commands::History(HistoryCommand::List { file_type }) => {
                assert_eq!(file_type.map(FileType::from), Some(FileType::Audio));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn history_clear_artifacts_flag() {
        let cli = parse(&["history", "clear", "--artifacts"]);
        assert!(matches!(
            cli.command,
            Commands::History(HistoryCommand::Clear { artifacts: true })
        ));
    }

    #[test]
    fn set_history_takes_a_value() {
        let cli = parse(&["settings", "set-history", "false"]);
        assert!(matches!(
            cli.command,
            Commands::Settings(SettingsCommand::SetHistory { enabled: false })
        ));
        assert!(Cli::try_parse_from(["convert-easy", "settings", "set-history"]).is_err());
    }

    #[test]
    fn export_and_storage() {
        let cli = parse(&["export", "abc", "/tmp/x.pdf"]);
        let Commands::Export(cmd) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(cmd.id, "abc");
        assert!(matches!(parse(&["storage"]).command, Commands::Storage));
    }
}
