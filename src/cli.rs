// SPDX-FileCopyrightText: 2021-2025 Robin Vobruba <hoijui.quaero@gmail.com>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use clap::{command, value_parser, Arg, ArgAction, Command, ValueHint};
use const_format::formatcp;
use std::path::PathBuf;

use census_places_scraper::{settings, snapshot};

pub const A_L_VERSION: &str = "version";
pub const A_S_VERSION: char = 'V';
pub const A_L_QUIET: &str = "quiet";
pub const A_S_QUIET: char = 'q';
pub const A_L_VERBOSE: &str = "verbose";
pub const A_S_VERBOSE: char = 'v';
pub const A_L_DATA_DIR: &str = "data-dir";
pub const A_S_DATA_DIR: char = 'd';
pub const A_L_INPUT: &str = "input";
pub const A_S_INPUT: char = 'i';
pub const A_L_OUTPUT: &str = "output";
pub const A_S_OUTPUT: char = 'o';

pub const SC_CRAWL: &str = "crawl";
pub const SC_STATUS: &str = "status";
pub const SC_TRANSFORM: &str = "transform";

fn arg_version() -> Arg {
    Arg::new(A_L_VERSION)
        .help("Print version information and exit. May be combined with -q,--quiet, to really only output the version string.")
        .short(A_S_VERSION)
        .long(A_L_VERSION)
        .action(ArgAction::SetTrue)
}

fn arg_quiet() -> Arg {
    Arg::new(A_L_QUIET)
        .help("Minimize or suppress output to stdout, and only log warnings and errors.")
        .long_help("Minimize or suppress output to stdout, and only log warnings and errors. Failed provinces are still reported.")
        .action(ArgAction::SetTrue)
        .short(A_S_QUIET)
        .long(A_L_QUIET)
        .global(true)
        .conflicts_with(A_L_VERBOSE)
}

fn arg_verbose() -> Arg {
    Arg::new(A_L_VERBOSE)
        .help("More verbose log output; including every single lookup.")
        .action(ArgAction::SetTrue)
        .short(A_S_VERBOSE)
        .long(A_L_VERBOSE)
        .global(true)
}

fn arg_data_dir() -> Arg {
    Arg::new(A_L_DATA_DIR)
        .help(formatcp!(
            "The directory holding the snapshots [default: from {}, or '{}']",
            settings::CONFIG_FILE,
            settings::DEFAULT_DATA_DIR
        ))
        .num_args(1)
        .value_parser(value_parser!(PathBuf))
        .value_name("DIR")
        .value_hint(ValueHint::DirPath)
        .short(A_S_DATA_DIR)
        .long(A_L_DATA_DIR)
        .global(true)
        .action(ArgAction::Set)
}

fn arg_input() -> Arg {
    Arg::new(A_L_INPUT)
        .help(formatcp!(
            "The complete place tree to transform [default: <data-dir>/{}]",
            snapshot::COMPLETE_FILE_NAME
        ))
        .num_args(1)
        .value_parser(value_parser!(PathBuf))
        .value_name("FILE")
        .value_hint(ValueHint::FilePath)
        .short(A_S_INPUT)
        .long(A_L_INPUT)
        .action(ArgAction::Set)
}

fn arg_output() -> Arg {
    Arg::new(A_L_OUTPUT)
        .help(formatcp!(
            "Where to write the import document to; never overwritten [default: <data-dir>/{}]",
            snapshot::IMPORT_FILE_NAME
        ))
        .num_args(1)
        .value_parser(value_parser!(PathBuf))
        .value_name("FILE")
        .value_hint(ValueHint::FilePath)
        .short(A_S_OUTPUT)
        .long(A_L_OUTPUT)
        .action(ArgAction::Set)
}

fn subcommand_crawl() -> Command {
    Command::new(SC_CRAWL)
        .about("Fetches all places still missing, resuming from the latest snapshot (default)")
}

fn subcommand_status() -> Command {
    Command::new(SC_STATUS).about("Reports what is still missing in the latest snapshot")
}

fn subcommand_transform() -> Command {
    Command::new(SC_TRANSFORM)
        .about("Converts a complete place tree into a document-store import file")
        .args([arg_input(), arg_output()])
}

pub fn args_matcher() -> Command {
    command!()
        .bin_name(clap::crate_name!())
        .help_template("{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}")
        .args([arg_version(), arg_quiet(), arg_verbose(), arg_data_dir()])
        .subcommands([subcommand_crawl(), subcommand_status(), subcommand_transform()])
        .disable_version_flag(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        args_matcher().debug_assert();
    }

    #[test]
    fn test_transform_args() {
        let matches = args_matcher()
            .try_get_matches_from([
                "census-places-scraper",
                "-d",
                "/tmp/census",
                "transform",
                "-o",
                "out.json",
            ])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>(A_L_DATA_DIR),
            Some(&PathBuf::from("/tmp/census"))
        );
        let (name, sub_matches) = matches.subcommand().unwrap();
        assert_eq!(name, SC_TRANSFORM);
        assert!(sub_matches.get_one::<PathBuf>(A_L_INPUT).is_none());
        assert_eq!(
            sub_matches.get_one::<PathBuf>(A_L_OUTPUT),
            Some(&PathBuf::from("out.json"))
        );
    }

    #[test]
    fn test_no_subcommand() {
        let matches = args_matcher()
            .try_get_matches_from(["census-places-scraper", "-q"])
            .unwrap();
        assert!(matches.subcommand().is_none());
        assert!(matches.get_flag(A_L_QUIET));
    }
}
