//! CLI tests: argument parsing, then the pure planning helpers behind each command.

use super::{Cli, CliCommand, DownloadArgs};
use clap::Parser;

pub(super) fn parse(args: &[&str]) -> CliCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

pub(super) fn download_args(args: &[&str]) -> DownloadArgs {
    match parse(args) {
        CliCommand::Download(args) => args,
        other => panic!("expected Download, got {other:?}"),
    }
}
