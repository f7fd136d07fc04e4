use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, ArgMatches, Parser};
use log::warn;
use thiserror::Error;

use crate::config::{BatchPolicy, Config};
use crate::png::text::{TextEntry, TextError};
use crate::png::{ChunkType, IEND};

#[derive(Parser, Debug)]
#[command(name = "pngmeta")]
#[command(about = "Add, dump and remove text metadata chunks of PNG files")]
#[command(author, version, long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["add", "dump", "remove"])))]
pub struct Cli {
    /// Add text chunk to a file
    #[arg(short = 'A', long)]
    pub add: bool,

    /// Dump text chunks from a file
    #[arg(short = 'D', long)]
    pub dump: bool,

    /// Remove chunks from a file
    #[arg(short = 'R', long)]
    pub remove: bool,

    /// Keyword for the text, must be immediately followed by --text
    #[arg(short, long, value_name = "KEYWORD", allow_hyphen_values = true)]
    pub key: Vec<String>,

    /// Text
    #[arg(short, long, value_name = "TEXT", allow_hyphen_values = true)]
    pub text: Vec<String>,

    /// Output file directory, files are rewritten in place otherwise
    #[arg(short, long, value_name = "OUTDIR")]
    pub dir: Option<PathBuf>,

    /// Remove all text chunks from the file before adding any chunk
    #[arg(short, long)]
    pub exclusive: bool,

    /// Index of a chunk to remove. This can be used multiple times
    #[arg(short, long, value_name = "INDEX")]
    pub chunk: Vec<usize>,

    /// Remove every chunk of this type, case sensitive. This can be used multiple times
    #[arg(long = "type", value_name = "TYPE", value_parser = parse_chunk_type)]
    pub types: Vec<ChunkType>,

    /// Produces human readable output instead of easy to parse output
    #[arg(long)]
    pub human: bool,

    /// Sets a custom config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Restamp chunks with a bad crc instead of rejecting the file
    #[arg(long)]
    pub no_verify_crc: bool,

    /// More logging, can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

fn parse_chunk_type(code: &str) -> Result<ChunkType, String> {
    ChunkType::try_from(code)
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    #[error("--key is not followed immediately by --text")]
    KeyWithoutText,
    #[error("--text is not preceeded by --key")]
    TextWithoutKey,
    #[error("no key or text specified")]
    NoEntries,
    #[error("no chunk index or type specified to remove")]
    NothingToRemove,
    #[error("IEND must stay the last chunk and cannot be removed")]
    TerminalType,
    #[error(transparent)]
    Text(#[from] TextError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Add {
        entries: Vec<TextEntry>,
        exclusive: bool,
    },
    Dump {
        human: bool,
    },
    Remove {
        indices: BTreeSet<usize>,
        types: HashSet<ChunkType>,
    },
}

/// Everything a batch run needs, validated before any file is opened
#[derive(Debug, Clone)]
pub struct Options {
    pub mode: Mode,
    pub out_dir: Option<PathBuf>,
    pub files: Vec<PathBuf>,
    pub verify_crc: bool,
    pub on_error: BatchPolicy,
}

// Each --text value has to sit right after its --key value, ie `-k K -t T`
// puts K at n and T at n + 2.
fn pair_entries(
    keys: &[(usize, String)],
    texts: &[(usize, String)],
) -> Result<Vec<TextEntry>, CliError> {
    let mut entries = Vec::with_capacity(keys.len());
    let mut texts = texts.iter().peekable();

    for (key_idx, key) in keys {
        match texts.next() {
            Some((text_idx, text)) if *text_idx == key_idx + 2 => {
                entries.push(TextEntry::new(key.as_str(), text.as_str()));
            }
            Some((text_idx, _)) if *text_idx < *key_idx => return Err(CliError::TextWithoutKey),
            _ => return Err(CliError::KeyWithoutText),
        }
    }

    if texts.peek().is_some() {
        return Err(CliError::TextWithoutKey);
    }
    Ok(entries)
}

fn indexed(matches: &ArgMatches, id: &str, values: &[String]) -> Vec<(usize, String)> {
    matches
        .indices_of(id)
        .map(|idx| idx.zip(values.iter().cloned()).collect())
        .unwrap_or_default()
}

impl Options {
    pub fn new(cli: Cli, matches: &ArgMatches, config: &Config) -> Result<Options, CliError> {
        let keys = indexed(matches, "key", &cli.key);
        let texts = indexed(matches, "text", &cli.text);
        let entries = pair_entries(&keys, &texts)?;

        let mode = if cli.add {
            if entries.is_empty() {
                return Err(CliError::NoEntries);
            }
            for entry in entries.iter() {
                entry.validate()?;
            }
            Mode::Add {
                entries,
                exclusive: cli.exclusive,
            }
        } else if cli.dump {
            Mode::Dump {
                human: cli.human || config.human,
            }
        } else {
            if cli.chunk.is_empty() && cli.types.is_empty() {
                return Err(CliError::NothingToRemove);
            }
            if cli.types.contains(&IEND) {
                return Err(CliError::TerminalType);
            }
            Mode::Remove {
                indices: cli.chunk.into_iter().collect(),
                types: cli.types.into_iter().collect(),
            }
        };

        if cli.exclusive && !cli.add {
            warn!("--exclusive only applies to --add, ignoring");
        }

        Ok(Options {
            mode,
            out_dir: cli.dir,
            files: cli.files,
            verify_crc: config.verify_crc && !cli.no_verify_crc,
            on_error: config.on_error,
        })
    }
}

#[cfg(test)]
mod test_cli {
    use super::*;
    use crate::png::TEXT;
    use clap::{CommandFactory, FromArgMatches};

    fn options(args: &[&str]) -> Result<Options, CliError> {
        options_with(args, &Config::default())
    }

    fn options_with(args: &[&str], config: &Config) -> Result<Options, CliError> {
        let matches = Cli::command()
            .try_get_matches_from(std::iter::once("pngmeta").chain(args.iter().copied()))
            .unwrap();
        let cli = Cli::from_arg_matches(&matches).unwrap();
        Options::new(cli, &matches, config)
    }

    fn clap_rejects(args: &[&str]) -> bool {
        Cli::command()
            .try_get_matches_from(std::iter::once("pngmeta").chain(args.iter().copied()))
            .is_err()
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_one_pair() {
        let opts = options(&["-A", "-k", "Author", "-t", "Jane", "a.png"]).unwrap();

        assert_eq!(
            opts.mode,
            Mode::Add {
                entries: vec![TextEntry::new("Author", "Jane")],
                exclusive: false,
            }
        );
        assert_eq!(opts.files, vec![PathBuf::from("a.png")]);
        assert!(opts.verify_crc);
        assert_eq!(opts.out_dir, None);
    }

    #[test]
    fn add_many_pairs_long_form() {
        let opts = options(&[
            "--add", "--exclusive", "--key", "A", "--text", "1", "--key=B", "--text=2", "-d", "out",
            "a.png", "b.png",
        ])
        .unwrap();

        assert_eq!(
            opts.mode,
            Mode::Add {
                entries: vec![TextEntry::new("A", "1"), TextEntry::new("B", "2")],
                exclusive: true,
            }
        );
        assert_eq!(opts.out_dir, Some(PathBuf::from("out")));
        assert_eq!(opts.files.len(), 2);
    }

    #[test]
    fn text_starting_with_dash() {
        let opts = options(&["-A", "-k", "Offset", "-t", "-5", "-k", "Flag", "-t", "--on", "a.png"])
            .unwrap();

        assert_eq!(
            opts.mode,
            Mode::Add {
                entries: vec![TextEntry::new("Offset", "-5"), TextEntry::new("Flag", "--on")],
                exclusive: false,
            }
        );
        assert_eq!(opts.files, vec![PathBuf::from("a.png")]);
    }

    #[test]
    fn key_not_followed_by_text() {
        assert_eq!(
            options(&["-A", "-k", "Author", "-e", "-t", "Jane", "a.png"]).unwrap_err(),
            CliError::KeyWithoutText
        );
        assert_eq!(
            options(&["-A", "-k", "Author", "a.png"]).unwrap_err(),
            CliError::KeyWithoutText
        );
    }

    #[test]
    fn text_without_key() {
        assert_eq!(
            options(&["-A", "-t", "Jane", "-k", "Author", "a.png"]).unwrap_err(),
            CliError::TextWithoutKey
        );
        assert_eq!(
            options(&["-A", "-k", "A", "-t", "1", "-t", "2", "a.png"]).unwrap_err(),
            CliError::TextWithoutKey
        );
    }

    #[test]
    fn add_needs_pair() {
        assert_eq!(options(&["-A", "a.png"]).unwrap_err(), CliError::NoEntries);
    }

    #[test]
    fn add_bad_keyword() {
        assert!(matches!(
            options(&["-A", "-k", " Author", "-t", "Jane", "a.png"]),
            Err(CliError::Text(TextError::InvalidKeyword { .. }))
        ));
    }

    #[test]
    fn dump_human() {
        let opts = options(&["-D", "--human", "a.png"]).unwrap();
        assert_eq!(opts.mode, Mode::Dump { human: true });

        let opts = options(&["-D", "a.png"]).unwrap();
        assert_eq!(opts.mode, Mode::Dump { human: false });

        let config = Config {
            human: true,
            ..Config::default()
        };
        let opts = options_with(&["-D", "a.png"], &config).unwrap();
        assert_eq!(opts.mode, Mode::Dump { human: true });
    }

    #[test]
    fn remove_chunks() {
        let opts = options(&["-R", "-c", "3", "--chunk", "1", "-c", "3", "--type", "tEXt", "a.png"])
            .unwrap();

        assert_eq!(
            opts.mode,
            Mode::Remove {
                indices: BTreeSet::from([1, 3]),
                types: HashSet::from([TEXT]),
            }
        );
    }

    #[test]
    fn remove_needs_target() {
        assert_eq!(options(&["-R", "a.png"]).unwrap_err(), CliError::NothingToRemove);
    }

    #[test]
    fn remove_iend_type() {
        assert_eq!(
            options(&["-R", "--type", "IEND", "a.png"]).unwrap_err(),
            CliError::TerminalType
        );
    }

    #[test]
    fn crc_policy() {
        let opts = options(&["-D", "--no-verify-crc", "a.png"]).unwrap();
        assert!(!opts.verify_crc);

        let config = Config {
            verify_crc: false,
            on_error: BatchPolicy::Continue,
            human: false,
        };
        let opts = options_with(&["-D", "a.png"], &config).unwrap();
        assert!(!opts.verify_crc);
        assert_eq!(opts.on_error, BatchPolicy::Continue);
    }

    #[test]
    fn rejected_by_parser() {
        // No mode
        assert!(clap_rejects(&["a.png"]));
        // Two modes
        assert!(clap_rejects(&["-A", "-D", "a.png"]));
        // No file
        assert!(clap_rejects(&["-D"]));
        // Not a number
        assert!(clap_rejects(&["-R", "-c", "two", "a.png"]));
        assert!(clap_rejects(&["-R", "-c", "-1", "a.png"]));
        // Not a chunk type
        assert!(clap_rejects(&["-R", "--type", "tEX", "a.png"]));
        // Unknown option
        assert!(clap_rejects(&["-D", "--frobnicate", "a.png"]));
    }
}
