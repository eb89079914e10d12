use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate subtitles for video files and directories of videos
    Generate {
        /// Video files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Target language code; omit to keep the source language
        #[arg(short, long)]
        target_lang: Option<String>,

        /// Segments per translation request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Preceding segments sent as context with each batch
        #[arg(long)]
        context_window: Option<usize>,
    },

    /// Run the HTTP task API
    Serve {
        /// Address to bind
        #[arg(long)]
        addr: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List available whisper models and their status
    Models {
        /// Download all missing models
        #[arg(long)]
        download: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_args() {
        let args = Args::parse_from([
            "subgen",
            "-v",
            "generate",
            "a.mp4",
            "shows/",
            "--target-lang",
            "en",
            "--batch-size",
            "8",
        ]);

        assert!(args.verbose);
        match args.command {
            Commands::Generate {
                inputs,
                target_lang,
                batch_size,
                context_window,
            } => {
                assert_eq!(inputs, vec![PathBuf::from("a.mp4"), PathBuf::from("shows/")]);
                assert_eq!(target_lang.as_deref(), Some("en"));
                assert_eq!(batch_size, Some(8));
                assert_eq!(context_window, None);
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_generate_requires_input() {
        assert!(Args::try_parse_from(["subgen", "generate"]).is_err());
    }

    #[test]
    fn test_serve_args() {
        let args = Args::parse_from(["subgen", "--config", "c.toml", "serve", "--port", "9000"]);
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(
            args.command,
            Commands::Serve { addr: None, port: Some(9000) }
        ));
    }
}
