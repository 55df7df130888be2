use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("trailmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("trailmap")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging on stderr")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the trailmap database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the trailmap database")
                        .default_value("~/.config/trailmap/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("crawl")
                .about("Crawl a site's link hierarchy and store it as the site map for a website.")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The root URL to crawl")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"website-id" <ID>)
                        .required(false)
                        .help("Website the site map belongs to (default: host of the root URL)"),
                )
                .arg(
                    arg!(-d --"depth" <MAX_DEPTH>)
                        .required(false)
                        .help("Maximum link depth below the root")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Maximum number of pages fetched concurrently")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-page fetch timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("10"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Also write the crawled hierarchy as JSON to this file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(db_arg()),
        )
        .subcommand(
            command!("ingest")
                .about("Import recorded visitor sessions from a JSON file")
                .arg(
                    arg!(-i --"input" <PATH>)
                        .required(true)
                        .help("JSON array of sessions ({visitorId, navigationPath, ...})")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(db_arg()),
        )
        .subcommand(
            command!("analyze")
                .about(
                    "Weight the latest site map with recorded traffic and detect backtracking. \
                Stores the result.",
                )
                .arg(
                    arg!(--"website-id" <ID>)
                        .required(true)
                        .help("Website whose latest site map is analyzed"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(db_arg()),
        )
}

fn db_arg() -> clap::Arg {
    arg!(--"db" <PATH>)
        .required(false)
        .help("Database file (default: ~/.config/trailmap/trailmap.db)")
        .value_parser(clap::value_parser!(std::path::PathBuf))
}
