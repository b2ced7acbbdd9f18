//! Warden - Jail Provisioning CLI
//!
//! Thin command-line surface over the provisioning workflow. The CLI
//! normalizes raw input (count digit-group separators, basejail type
//! spellings) and translates the batch outcome into a process exit
//! code; all creation logic lives in the library.
//!
//! ## Usage
//!
//! ```sh
//! warden create --release 13.2-RELEASE
//! warden create -c 3 -r 13.2-RELEASE boot=yes
//! warden create -t golden -n web01
//! warden create -b --basejail-type nullfs -r 13.2-RELEASE
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use warden::{
    BasejailType, DirBackend, FetchPolicy, Host, ProvisioningRequest, ProvisioningWorkflow,
    SourceResolver,
};

/// Batches above this size need --force as a mistyped-count guard.
const FORCE_THRESHOLD: u32 = 100;

/// Returns the default backend base directory.
fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".warden"))
        .unwrap_or_else(|| PathBuf::from(".warden"))
}

// =============================================================================
// CLI Parsing
// =============================================================================

#[derive(Debug)]
enum Command {
    Create(Box<CreateArgs>),
    Version,
    Help,
}

#[derive(Debug, Default)]
struct CreateArgs {
    count: u32,
    release: Option<String>,
    template: Option<String>,
    pkglist: Option<PathBuf>,
    name: Option<String>,
    basejail: bool,
    basejail_type: Option<BasejailType>,
    empty: bool,
    no_fetch: bool,
    force: bool,
    base: Option<PathBuf>,
    mirror: Option<PathBuf>,
    props: Vec<String>,
}

/// Normalizes count input to an integer.
///
/// Digit-group separators are accepted ("1,000" becomes 1000);
/// non-numeric or zero input is rejected here, before the workflow
/// ever sees it.
fn parse_count(text: &str) -> Result<u32, String> {
    let cleaned = text.replace(',', "");
    let value: u32 = cleaned
        .parse()
        .map_err(|_| format!("{} is not a valid integer", text))?;
    if value == 0 {
        return Err("count must be at least 1".to_string());
    }
    Ok(value)
}

fn parse_create_args(args: &[String]) -> Result<CreateArgs, String> {
    let mut out = CreateArgs {
        count: 1,
        ..CreateArgs::default()
    };

    let take_value = |args: &[String], i: usize, flag: &str| -> Result<String, String> {
        args.get(i + 1)
            .cloned()
            .ok_or_else(|| format!("{} requires a value", flag))
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                out.count = parse_count(&take_value(args, i, "--count")?)?;
                i += 2;
            }
            "--release" | "-r" => {
                out.release = Some(take_value(args, i, "--release")?);
                i += 2;
            }
            "--template" | "-t" => {
                out.template = Some(take_value(args, i, "--template")?);
                i += 2;
            }
            "--pkglist" | "-p" => {
                out.pkglist = Some(PathBuf::from(take_value(args, i, "--pkglist")?));
                i += 2;
            }
            "--name" | "-n" => {
                out.name = Some(take_value(args, i, "--name")?);
                i += 2;
            }
            "--basejail" | "-b" => {
                out.basejail = true;
                i += 1;
            }
            "--basejail-type" => {
                let raw = take_value(args, i, "--basejail-type")?;
                out.basejail_type = Some(raw.parse::<BasejailType>().map_err(|e| e.to_string())?);
                i += 2;
            }
            "--empty" | "-e" => {
                out.empty = true;
                i += 1;
            }
            "--no-fetch" => {
                out.no_fetch = true;
                i += 1;
            }
            "--force" | "-f" => {
                out.force = true;
                i += 1;
            }
            "--base" => {
                out.base = Some(PathBuf::from(take_value(args, i, "--base")?));
                i += 2;
            }
            "--mirror" => {
                out.mirror = Some(PathBuf::from(take_value(args, i, "--mirror")?));
                i += 2;
            }
            flag if flag.starts_with('-') => {
                return Err(format!("unknown option: {}", flag));
            }
            prop => {
                out.props.push(prop.to_string());
                i += 1;
            }
        }
    }

    Ok(out)
}

fn parse_args() -> Result<Command, String> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "create" => Ok(Command::Create(Box::new(parse_create_args(&args[2..])?))),
        "version" => Ok(Command::Version),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command: {}", other)),
    }
}

// =============================================================================
// Commands
// =============================================================================

fn cmd_create(args: CreateArgs) -> Result<bool, String> {
    if args.count > FORCE_THRESHOLD && !args.force {
        return Err(format!(
            "refusing to create {} jails without --force",
            args.count
        ));
    }

    let base = args.base.unwrap_or_else(default_base_dir);
    let mut backend = DirBackend::new(base).map_err(|e| e.to_string())?;
    if let Some(mirror) = args.mirror {
        backend = backend.with_mirror(mirror);
    }
    let backend = Arc::new(backend);

    let resolver = SourceResolver::new(backend.clone(), backend.clone());
    let workflow = ProvisioningWorkflow::new(resolver, backend.clone(), backend.jail_root());

    let request = ProvisioningRequest {
        release: args.release,
        template: args.template,
        count: args.count,
        name: args.name,
        basejail: args.basejail,
        basejail_type: args.basejail_type,
        empty: args.empty,
        pkglist: args.pkglist,
        fetch_policy: if args.no_fetch {
            FetchPolicy::FailIfMissing
        } else {
            FetchPolicy::AutoFetch
        },
        props: args.props,
    };

    let host = Host::detect().map_err(|e| format!("failed to detect host release: {}", e))?;

    let runtime = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
    let outcomes = runtime
        .block_on(workflow.create(&request, &host))
        .map_err(|e| e.to_string())?;

    let mut all_ok = true;
    for outcome in &outcomes {
        let suffix = if request.count > 1 {
            format!(" ({}/{})", outcome.index + 1, request.count)
        } else {
            String::new()
        };
        match &outcome.result {
            Ok(()) => println!("{} successfully created{}", outcome.name, suffix),
            Err(e) => {
                all_ok = false;
                eprintln!("{} could not be created{}: {}", outcome.name, suffix, e);
            }
        }
    }

    Ok(all_ok)
}

fn cmd_version() {
    println!("warden version {}", env!("CARGO_PKG_VERSION"));
}

fn cmd_help() {
    println!(
        r#"warden - jail provisioning

USAGE:
    warden create [options] [key=value ...]

OPTIONS:
    --count, -c <n>           Number of jails to create (default: 1)
    --release, -r <name>      RELEASE to create the jail from
    --template, -t <name>     Existing jail to clone instead of a RELEASE
    --name, -n <name>         Explicit name (count must be 1)
    --pkglist, -p <file>      Package list carried onto the jail config
    --basejail, -b            Create basejails (release dirs mounted at start)
    --basejail-type <t>       Mount strategy: nullfs or zfs
    --empty, -e               Create empty jails with no release payload
    --no-fetch                Fail instead of fetching a missing release
    --force, -f               Allow batches larger than 100 jails
    --base <dir>              Backend base directory (default: ~/.warden)
    --mirror <dir>            Local release mirror used for fetching

Trailing key=value tokens set jail properties at creation time.

EXAMPLES:
    warden create -r 13.2-RELEASE -n web01 tag=frontend
    warden create -c 1,000 -r 13.2-RELEASE --force
"#
    );
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    match parse_args() {
        Ok(Command::Create(args)) => match cmd_create(*args) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Ok(Command::Version) => {
            cmd_version();
            ExitCode::SUCCESS
        }
        Ok(Command::Help) => {
            cmd_help();
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            cmd_help();
            ExitCode::FAILURE
        }
    }
}
