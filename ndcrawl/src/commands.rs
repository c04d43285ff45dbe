use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("ndcrawl")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("ndcrawl")
        .about("Discover network topology via CDP/LLDP")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Writes a default ndcrawl configuration file")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Directory to store the ndcrawl configuration")
                        .default_value("~/.config/ndcrawl/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help("Overwrite any existing configuration without asking.")
                        .required(false),
                ),
        )
        .subcommand(
            command!("crawl")
                .about(
                    "Log into seed devices and crawl outward through their CDP and LLDP \
                neighbors.",
                )
                .arg(
                    arg!(-s --"seed" <SEEDS>)
                        .required(true)
                        .help("Seed devices to start the crawl, comma separated (switch1[,switch2])"),
                )
                .arg(
                    arg!(-u --"user" <USER>)
                        .required(true)
                        .help("Username to log in as. The password is read from NDCRAWL_PASSWORD or prompted for."),
                )
                .arg(
                    arg!(--"conf" <FILE>)
                        .required(false)
                        .help("Alternate configuration file (default: ~/.config/ndcrawl/ndcrawl.json)"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Write the neighbor CSV to this file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"devices-out" <PATH>)
                        .required(false)
                        .help("Write the device CSV to this file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"netgrph-out" <PATH>)
                        .required(false)
                        .help("Write a NetGrph import CSV to this file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"json-out" <PATH>)
                        .required(false)
                        .help("Write the full crawl result as JSON to this file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"dot-out" <PATH>)
                        .required(false)
                        .help("Write a Graphviz topology to this file")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"format" <FORMAT>)
                        .required(false)
                        .help("Format of the report printed when the crawl ends")
                        .value_parser(["text", "json", "csv", "dot"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("Maximum number of devices scraped at once (overrides thread_count)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"max-crawl" <NUM_DEVICES>)
                        .required(false)
                        .help("Maximum number of devices to log into (overrides max_crawl)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"seed-os" <OS>)
                        .required(false)
                        .help("Operating system of the seed devices (overrides seed_os)")
                        .value_parser(["cisco_ios", "cisco_nxos"]),
                )
                .arg(
                    arg!(--"ignore-regex" <REGEX>)
                        .required(false)
                        .help("Neighbors whose name matches this pattern are dropped (overrides ignore_regex)"),
                )
                .arg(
                    arg!(--"join-timeout" <SECONDS>)
                        .required(false)
                        .help("Seconds to wait for each batch of devices (overrides join_timeout_secs)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"strict-lldp-summary")
                        .required(false)
                        .help("Read the LLDP summary table by its header columns instead of fixed positions")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-d --"debug")
                        .required(false)
                        .help("Increase console logging (-d info, -dd debug)")
                        .action(clap::ArgAction::Count),
                ),
        )
}
