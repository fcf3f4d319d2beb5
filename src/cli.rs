use clap::{
    crate_authors, crate_description, crate_version, value_parser, Arg, ArgAction, ArgMatches,
    Command,
};
use pretty_env_logger::env_logger::Builder;
use snafu::prelude::*;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;

use labmanager_rs::common::{key_file_or_string, ConfigurationSnafu};
use labmanager_rs::{
    Configuration, ConfigurationAction, CredentialOverrides, Credentials,
    DeleteOptions, FileConfig, LabManager, MachinesOptions, Result,
};

fn set_logger_level(b: &mut Builder) {
    let mut b = b;
    if env::var("RUST_LOG").is_err() {
        b = b.filter_level(log::LevelFilter::Info)
    }
    b.init();
}

fn setup_logger() {
    // Adapted from env_logger examples. <3 Systemd support
    match std::env::var("RUST_LOG_STYLE") {
        Ok(s) if s == "SYSTEMD" => {
            let builder = &mut pretty_env_logger::env_logger::builder();
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "<{}>{}: {}",
                    match record.level() {
                        log::Level::Error => 3,
                        log::Level::Warn => 4,
                        log::Level::Info => 6,
                        log::Level::Debug => 7,
                        log::Level::Trace => 7,
                    },
                    record.target(),
                    record.args()
                )
            });
            set_logger_level(builder);
        }
        _ => {
            let builder = &mut pretty_env_logger::formatted_builder();
            set_logger_level(builder);
        }
    };
}

fn configuration_arg() -> Arg {
    Arg::new("configuration")
        .required(true)
        .help("Configuration name, or id if all digits")
}

fn command() -> Command {
    Command::new("labmanager")
        .about(format!(
            "{}\n{} {}",
            crate_description!(),
            "url, username and password are read from ~/.lab_manager",
            "unless given as arguments.",
        ))
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Config file path"),
        )
        .arg(Arg::new("url").long("url").global(true).help("Lab Manager SOAP endpoint"))
        .arg(Arg::new("username").long("username").global(true))
        .arg(
            Arg::new("password")
                .long("password")
                .global(true)
                .help("Password, or @path to read it from a file"),
        )
        .arg(Arg::new("organization").long("organization").global(true))
        .arg(Arg::new("workspace").long("workspace").global(true))
        .subcommand_required(true)
        .subcommand(
            Command::new("configuration")
                .about("Show a configuration as id,name,deployed")
                .arg(configuration_arg()),
        )
        .subcommand(Command::new("configurations").about("List library configurations"))
        .subcommand(
            Command::new("machines")
                .about("List machines as name,internal_ip,external_ip")
                .arg(configuration_arg())
                .arg(
                    Arg::new("exclude")
                        .long("exclude")
                        .action(ArgAction::Append)
                        .value_delimiter(',')
                        .help("Machine names to leave out"),
                ),
        )
        .subcommand(
            Command::new("machine")
                .about("Show a single machine")
                .arg(configuration_arg())
                .arg(Arg::new("machine").required(true)),
        )
        .subcommand(
            Command::new("clone")
                .about("Clone a configuration, prints the new id")
                .arg(configuration_arg())
                .arg(Arg::new("new_name").required(true)),
        )
        .subcommand(
            Command::new("checkout")
                .about("Check out a library configuration, prints the new id")
                .arg(configuration_arg())
                .arg(Arg::new("new_name").required(true)),
        )
        .subcommand(
            Command::new("undeploy")
                .about("Undeploy a configuration")
                .arg(configuration_arg()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a configuration")
                .arg(configuration_arg())
                .arg(
                    Arg::new("force")
                        .action(ArgAction::SetTrue)
                        .short('f')
                        .long("force")
                        .help("Undeploy first if deployed"),
                ),
        )
        .subcommand(
            Command::new("revert")
                .about("Revert a configuration to its last snapshot")
                .arg(configuration_arg()),
        )
        .subcommand(
            Command::new("action")
                .about("Perform a power or snapshot action on a configuration")
                .arg(configuration_arg())
                .arg(
                    Arg::new("action")
                        .required(true)
                        .value_parser(|s: &str| s.parse::<ConfigurationAction>().map_err(|e| e.to_string()))
                        .help("poweron, poweroff, suspend, resume, reset, snapshot, revert or shutdown"),
                ),
        )
        .version(crate_version!())
        .author(crate_authors!("\n"))
}

fn string_arg<'a>(args: &'a ArgMatches, name: &str) -> &'a str {
    args.get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

fn configuration_csv(configuration: &Configuration) -> String {
    format!(
        "{},{},{}",
        configuration.id.as_deref().unwrap_or_default(),
        configuration.name.as_deref().unwrap_or_default(),
        configuration.deployed
    )
}

fn client(args: &ArgMatches) -> Result<LabManager> {
    let file = match args.get_one::<PathBuf>("config") {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::load_default()?,
    };

    // Only the command line argument expands @path, so stored passwords
    // are used as written.
    let password = args
        .get_one::<String>("password")
        .cloned()
        .map(|value| key_file_or_string(value, "password"))
        .transpose()?;

    let credentials = Credentials::from_sources(
        &file,
        CredentialOverrides {
            url: args.get_one::<String>("url").cloned(),
            username: args.get_one::<String>("username").cloned(),
            password,
        },
    )?;

    let organization = args
        .get_one::<String>("organization")
        .cloned()
        .or(file.organization)
        .context(ConfigurationSnafu {
            message: "Missing organization",
        })?;

    let mut lab = LabManager::new(organization, credentials)?;
    lab.set_workspace(args.get_one::<String>("workspace").cloned().or(file.workspace));
    Ok(lab)
}

/// Runs the selected subcommand and returns the exit code.
fn run(args: &ArgMatches) -> Result<i32> {
    let lab = client(args)?;

    match args.subcommand() {
        Some(("configuration", sub)) => {
            let configuration = lab.configuration(string_arg(sub, "configuration"))?;
            println!("{}", configuration_csv(&configuration));
        }
        Some(("configurations", _)) => {
            for configuration in lab.configurations()? {
                println!("{}", configuration_csv(&configuration));
            }
        }
        Some(("machines", sub)) => {
            let options = MachinesOptions {
                exclude: sub
                    .get_many::<String>("exclude")
                    .map(|names| names.cloned().collect())
                    .unwrap_or_default(),
            };
            for machine in lab.machines(string_arg(sub, "configuration"), &options)? {
                println!("{}", machine.to_csv());
            }
        }
        Some(("machine", sub)) => {
            match lab.machine(
                sub.get_one::<String>("configuration").map(String::as_str),
                sub.get_one::<String>("machine").map(String::as_str),
            )? {
                Some(machine) => println!("{}", machine.to_csv()),
                None => {
                    tracing::warn!(machine = string_arg(sub, "machine"), "Machine not found");
                    return Ok(1);
                }
            }
        }
        Some(("clone", sub)) => {
            let id = lab.clone(string_arg(sub, "configuration"), string_arg(sub, "new_name"))?;
            println!("{id}");
        }
        Some(("checkout", sub)) => {
            let id = lab.checkout(string_arg(sub, "configuration"), string_arg(sub, "new_name"))?;
            println!("{id}");
        }
        Some(("undeploy", sub)) => lab.undeploy(string_arg(sub, "configuration"))?,
        Some(("delete", sub)) => lab.delete(
            string_arg(sub, "configuration"),
            &DeleteOptions {
                force: sub.get_flag("force"),
            },
        )?,
        Some(("revert", sub)) => lab.revert(string_arg(sub, "configuration"))?,
        Some(("action", sub)) => {
            let Some(action) = sub.get_one::<ConfigurationAction>("action").copied() else {
                return Ok(2);
            };
            lab.perform_action(string_arg(sub, "configuration"), action)?
        }
        _ => return Ok(2),
    }

    Ok(0)
}

pub(crate) fn main() {
    let args = command().get_matches();

    setup_logger();

    match run(&args) {
        Ok(code) => exit(code),
        Err(err) => {
            println!("{err}");
            exit(2);
        }
    }
}
