use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::config::CompareMode;

pub(crate) const PROGRAM_NAME: &str = "treesync";

/// Flags accepted by every command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub verbose: u8,
    pub json: bool,
    pub porcelain: bool,
    pub show_hashes: bool,
    pub show_ignored: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CommandArgs {
    Init(InitArgs),
    Ls(LsArgs),
    Sync(SyncArgs),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct InitArgs {
    /// Destination; `-` writes to standard output.
    pub path: Option<PathBuf>,
    pub force: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LsArgs {
    pub roots: Vec<String>,
    pub list_concurrency: Option<usize>,
    pub no_follow_symlinks: bool,
}

/// Root and ignore flags for one side of a sync.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ProviderArgs {
    pub root: Option<String>,
    pub ignore: Vec<String>,
    pub ignore_file: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SyncArgs {
    pub origin: ProviderArgs,
    pub target: ProviderArgs,
    pub strip_suffix: Option<String>,
    pub delete: bool,
    pub no_add: bool,
    pub compare: Option<CompareMode>,
    pub compare_concurrency: Option<usize>,
    pub list_concurrency: Option<usize>,
    pub concurrency: Option<usize>,
    pub no_follow_symlinks: bool,
    pub no_checksum: bool,
    pub dry_run: bool,
    pub yes: bool,
    pub show_skipped: bool,
    pub show_params: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ParsedArgs {
    pub global: GlobalArgs,
    pub command: CommandArgs,
}

const NO_FOLLOW_HELP: &str =
    "Report symbolic links in local trees as ignored instead of following them.";

fn flag(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(id).help(help).action(ArgAction::SetTrue)
}

fn count_arg(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .value_name("N")
        .help(help)
        .value_parser(value_parser!(usize))
}

pub(crate) fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mirror a content tree from an origin root onto a target root.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Load settings from FILE instead of ./treesync.json.")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase diagnostic output on stderr (repeatable).")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(flag("json", "Render output as JSON documents.").global(true))
        .arg(
            flag(
                "porcelain",
                "Print sizes in bytes, durations in milliseconds and dates as ISO 8601.",
            )
            .global(true),
        )
        .arg(
            flag("show-hashes", "Display content hashes (computed if needed by ls).")
                .alias("hash")
                .global(true),
        )
        .arg(flag("show-ignored", "Display ignored entries.").global(true))
        .subcommand(
            Command::new("init")
                .about("Write a starter treesync.json.")
                .arg(
                    Arg::new("path")
                        .value_name("FILE")
                        .help("Destination file, or - for stdout.")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(flag("force", "Overwrite an existing file.")),
        )
        .subcommand(
            Command::new("ls")
                .about("List the entries of each root.")
                .arg(
                    Arg::new("roots")
                        .value_name("ROOT")
                        .help("Roots to list (defaults to the configured origin and target).")
                        .num_args(0..)
                        .action(ArgAction::Append),
                )
                .arg(count_arg("list-concurrency", "Maximum roots listed at once."))
                .arg(flag("no-follow-symlinks", NO_FOLLOW_HELP)),
        )
        .subcommand(
            Command::new("sync")
                .about("Upload changed origin entries to the target.")
                .arg(
                    Arg::new("origin")
                        .value_name("ORIGIN")
                        .help("Origin root (defaults to the current directory)."),
                )
                .arg(Arg::new("target").value_name("TARGET").help("Target root."))
                .arg(flag("delete", "Delete target entries missing from the origin."))
                .arg(flag(
                    "no-add",
                    "Only upload origin entries that already exist in the target.",
                ))
                .arg(
                    Arg::new("compare")
                        .long("compare")
                        .value_name("MODE")
                        .help(
                            "Compare matched entries by hash, size or modified, \
                             or treat them as always changed.",
                        )
                        .value_parser(|value: &str| value.parse::<CompareMode>()),
                )
                .arg(count_arg("compare-concurrency", "Maximum comparisons at once."))
                .arg(count_arg("list-concurrency", "Maximum roots listed at once."))
                .arg(count_arg("concurrency", "Maximum operations at once.").short('j'))
                .arg(
                    Arg::new("ignore")
                        .long("ignore")
                        .short('i')
                        .value_name("PATTERN")
                        .help("Ignore origin entries matching PATTERN (repeatable).")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("target-ignore")
                        .long("target-ignore")
                        .short('I')
                        .value_name("PATTERN")
                        .help("Ignore target entries matching PATTERN (repeatable).")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("ignore-file")
                        .long("ignore-file")
                        .value_name("FILE")
                        .help("Read origin ignore patterns from FILE.")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("target-ignore-file")
                        .long("target-ignore-file")
                        .value_name("FILE")
                        .help("Read target ignore patterns from FILE.")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("strip-suffix")
                        .long("strip-suffix")
                        .value_name("SUFFIX")
                        .help("Remove SUFFIX from keys written to the target (e.g. .gz)."),
                )
                .arg(flag("no-follow-symlinks", NO_FOLLOW_HELP))
                .arg(flag(
                    "no-checksum",
                    "Do not send the origin MD5 with uploads to a bucket target.",
                ))
                .arg(
                    flag("dry-run", "Preview the plan without performing it.")
                        .short('n')
                        .conflicts_with("yes"),
                )
                .arg(flag("yes", "Perform the plan without prompting.").short('y'))
                .arg(flag("show-skipped", "Display unchanged and excluded entries."))
                .arg(flag("show-params", "Display backend request parameters.")),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn parse_sync(matches: &ArgMatches) -> SyncArgs {
    SyncArgs {
        origin: ProviderArgs {
            root: matches.get_one::<String>("origin").cloned(),
            ignore: strings(matches, "ignore"),
            ignore_file: matches.get_one::<PathBuf>("ignore-file").cloned(),
        },
        target: ProviderArgs {
            root: matches.get_one::<String>("target").cloned(),
            ignore: strings(matches, "target-ignore"),
            ignore_file: matches.get_one::<PathBuf>("target-ignore-file").cloned(),
        },
        strip_suffix: matches.get_one::<String>("strip-suffix").cloned(),
        delete: matches.get_flag("delete"),
        no_add: matches.get_flag("no-add"),
        compare: matches.get_one::<CompareMode>("compare").copied(),
        compare_concurrency: matches.get_one::<usize>("compare-concurrency").copied(),
        list_concurrency: matches.get_one::<usize>("list-concurrency").copied(),
        concurrency: matches.get_one::<usize>("concurrency").copied(),
        no_follow_symlinks: matches.get_flag("no-follow-symlinks"),
        no_checksum: matches.get_flag("no-checksum"),
        dry_run: matches.get_flag("dry-run"),
        yes: matches.get_flag("yes"),
        show_skipped: matches.get_flag("show-skipped"),
        show_params: matches.get_flag("show-params"),
    }
}

pub(crate) fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();

    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }

    let matches = clap_command().try_get_matches_from(args)?;

    let global = GlobalArgs {
        config: matches.get_one::<PathBuf>("config").cloned(),
        verbose: matches.get_count("verbose"),
        json: matches.get_flag("json"),
        porcelain: matches.get_flag("porcelain"),
        show_hashes: matches.get_flag("show-hashes"),
        show_ignored: matches.get_flag("show-ignored"),
    };

    let command = match matches.subcommand() {
        Some(("init", sub)) => CommandArgs::Init(InitArgs {
            path: sub.get_one::<PathBuf>("path").cloned(),
            force: sub.get_flag("force"),
        }),
        Some(("ls", sub)) => CommandArgs::Ls(LsArgs {
            roots: strings(sub, "roots"),
            list_concurrency: sub.get_one::<usize>("list-concurrency").copied(),
            no_follow_symlinks: sub.get_flag("no-follow-symlinks"),
        }),
        Some(("sync", sub)) => CommandArgs::Sync(parse_sync(sub)),
        _ => {
            return Err(clap_command().error(ErrorKind::MissingSubcommand, "a command is required"));
        }
    };

    Ok(ParsedArgs { global, command })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ParsedArgs {
        parse_args(args.iter().copied()).expect("parse")
    }

    fn sync_args(args: &[&str]) -> SyncArgs {
        match parse(args).command {
            CommandArgs::Sync(sync) => sync,
            other => panic!("expected sync, got {other:?}"),
        }
    }

    #[test]
    fn command_definition_is_consistent() {
        clap_command().debug_assert();
    }

    #[test]
    fn sync_positionals_and_flags() {
        let sync = sync_args(&[
            "treesync", "sync", "site", "/srv/www", "--delete", "--no-add", "-j", "4",
            "--compare", "size", "-i", "*.tmp", "-i", ".*", "-I", "keep/", "-n",
        ]);
        assert_eq!(sync.origin.root.as_deref(), Some("site"));
        assert_eq!(sync.target.root.as_deref(), Some("/srv/www"));
        assert!(sync.delete);
        assert!(sync.no_add);
        assert!(sync.dry_run);
        assert_eq!(sync.concurrency, Some(4));
        assert_eq!(sync.compare, Some(CompareMode::Size));
        assert_eq!(sync.origin.ignore, ["*.tmp", ".*"]);
        assert_eq!(sync.target.ignore, ["keep/"]);
    }

    #[test]
    fn sync_defaults_are_unset() {
        let sync = sync_args(&["treesync", "sync"]);
        assert_eq!(sync, SyncArgs::default());
    }

    #[test]
    fn global_flags_follow_the_command() {
        let parsed = parse(&[
            "treesync", "ls", "a", "b", "--json", "-vv", "--hash", "--config", "alt.json",
        ]);
        assert!(parsed.global.json);
        assert!(parsed.global.show_hashes);
        assert_eq!(parsed.global.verbose, 2);
        assert_eq!(parsed.global.config, Some(PathBuf::from("alt.json")));
        assert_eq!(
            parsed.command,
            CommandArgs::Ls(LsArgs {
                roots: vec!["a".to_owned(), "b".to_owned()],
                ..LsArgs::default()
            })
        );
    }

    #[test]
    fn link_and_checksum_flags() {
        let sync = sync_args(&["treesync", "sync", "--no-follow-symlinks", "--no-checksum"]);
        assert!(sync.no_follow_symlinks);
        assert!(sync.no_checksum);

        let parsed = parse(&["treesync", "ls", "--no-follow-symlinks"]);
        assert!(matches!(
            parsed.command,
            CommandArgs::Ls(LsArgs { no_follow_symlinks: true, .. })
        ));
    }

    #[test]
    fn dry_run_conflicts_with_yes() {
        let error = parse_args(["treesync", "sync", "-n", "-y"]).expect_err("conflict");
        assert_eq!(error.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn unknown_compare_mode_is_rejected() {
        let error = parse_args(["treesync", "sync", "--compare", "fuzzy"]).expect_err("mode");
        assert_eq!(error.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn init_accepts_stdout_destination() {
        let parsed = parse(&["treesync", "init", "-", "--force"]);
        assert_eq!(
            parsed.command,
            CommandArgs::Init(InitArgs {
                path: Some(PathBuf::from("-")),
                force: true,
            })
        );
    }
}
