//! Slash commands typed into the composer.

use bookswap_proto::ImageRef;
use thiserror::Error;

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/search [query]`: filter the directory. No query clears the filter.
    Search(String),
    /// `/attach <ref>...`: stage uploaded images.
    Attach(Vec<ImageRef>),
    /// `/unattach <n>`: remove the n-th staged image (1-based).
    Unattach(usize),
    /// `/edit`: edit the highlighted message.
    Edit,
    /// `/delete`: delete the highlighted message.
    Delete,
    /// `/view`: open the images of the highlighted message.
    View,
    /// `/retry`: reload a thread that failed to load.
    Retry,
    /// `/connect`: reconnect to the relay.
    Connect,
    /// `/quit`: exit.
    Quit,
}

/// Reasons a command line could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Not a known command.
    #[error("unknown command: /{0}")]
    Unknown(String),

    /// Required argument is missing.
    #[error("usage: {usage}")]
    MissingArgument {
        /// Usage line.
        usage: &'static str,
    },

    /// Index argument is not a positive number.
    #[error("invalid image number: {0}")]
    InvalidIndex(String),
}

impl Command {
    /// Parse a composer line. Returns `None` if the line is not a command.
    pub fn parse(line: &str) -> Option<Result<Self, CommandError>> {
        let rest = line.trim().strip_prefix('/')?;
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let args = args.trim();

        Some(match name {
            "search" | "s" => Ok(Self::Search(args.to_string())),
            "attach" | "a" => {
                let images: Vec<_> = args.split_whitespace().map(ImageRef::new).collect();
                if images.is_empty() {
                    Err(CommandError::MissingArgument { usage: "/attach <image>..." })
                } else {
                    Ok(Self::Attach(images))
                }
            },
            "unattach" => match args.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Self::Unattach(n - 1)),
                _ if args.is_empty() => {
                    Err(CommandError::MissingArgument { usage: "/unattach <n>" })
                },
                _ => Err(CommandError::InvalidIndex(args.to_string())),
            },
            "edit" | "e" => Ok(Self::Edit),
            "delete" | "d" => Ok(Self::Delete),
            "view" | "v" => Ok(Self::View),
            "retry" => Ok(Self::Retry),
            "connect" => Ok(Self::Connect),
            "quit" | "q" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        })
    }
}
