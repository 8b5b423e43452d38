use clap::{arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("orbit")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("orbit")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl the mutual-follow neighbourhood of an account and summarize the \
                resulting graph.",
                )
                .arg(
                    arg!(-u --"user" <HANDLE>)
                        .required(true)
                        .help("The handle (screen name) to start from, with or without '@'"),
                )
                .arg(
                    arg!(--"snapshot" <PATH>)
                        .required(false)
                        .help("Crawl a JSON snapshot of a follow graph instead of the live API")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("api-base"),
                )
                .arg(
                    arg!(--"api-base" <URL>)
                        .required(false)
                        .help("Base URL of the REST API")
                        .value_parser(clap::value_parser!(Url))
                        .default_value(orbit_crawler::http::DEFAULT_API_BASE),
                )
                .arg(
                    arg!(--"token" <TOKEN>)
                        .required(false)
                        .help("Bearer token for the API (default: $ORBIT_BEARER_TOKEN)"),
                )
                .arg(
                    arg!(-n --"node-budget" <COUNT>)
                        .required(false)
                        .help("Stop expanding once this many accounts are discovered")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(-k --"fanout" <COUNT>)
                        .required(false)
                        .help("Mutual connections promoted per expanded account")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(--"connection-cap" <COUNT>)
                        .required(false)
                        .help("Maximum ids read from each friends or followers listing")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5000"),
                )
                .arg(
                    arg!(--"batch-size" <COUNT>)
                        .required(false)
                        .help("Accounts per popularity lookup request")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(--"cooldown" <SECONDS>)
                        .required(false)
                        .help("Seconds to wait after a rate limit or provider error")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("60"),
                )
                .arg(
                    arg!(--"max-retries" <COUNT>)
                        .required(false)
                        .help("Give up after this many consecutive failures (default: retry forever)")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    arg!(--"dedupe-frontier")
                        .required(false)
                        .help("Do not queue accounts that were already discovered")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Directory for the report and graph renderings")
                        .default_value("."),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-v --"verbose")
                        .required(false)
                        .help("Log provider requests and crawl decisions")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
