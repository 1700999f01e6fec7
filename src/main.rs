// CLI entry point for authdiff
// Uses clap for argument parsing; all process-exit decisions live here.

use authdiff::extract;
use authdiff::introspect::{parse_schema, IntrospectionClient};
use authdiff::models::CredentialContext;
use authdiff::prober::HttpProber;
use authdiff::reporting::{export_csv, save_json, ConsoleReporter, Summary};
use authdiff::runner::DifferentialRunner;
use authdiff::targets::load_target_list;
use authdiff::ScanError;
use clap::{Arg, ArgAction, Command};
use std::sync::atomic::Ordering;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);
const INTROSPECT_TIMEOUT: Duration = Duration::from_secs(30);

fn header_args() -> [Arg; 2] {
    [
        Arg::new("token")
            .long("token")
            .num_args(1)
            .help("Bearer token for authenticated requests"),
        Arg::new("header")
            .short('H')
            .long("header")
            .action(ArgAction::Append)
            .help("Extra header (Key: Value), repeatable"),
    ]
}

fn cli() -> Command {
    Command::new("authdiff")
        .version("0.2.0")
        .about("Differential authorization-exposure scanner for HTTP and GraphQL APIs")
        .subcommand_required(true)
        .subcommand(
            Command::new("probe")
                .about("Probe endpoints with and without authentication")
                .arg(Arg::new("base_url")
                    .short('b')
                    .long("base-url")
                    .required(true)
                    .num_args(1)
                    .help("Base URL of the target API"))
                .arg(Arg::new("endpoints")
                    .short('e')
                    .long("endpoints")
                    .required(true)
                    .num_args(1)
                    .help("JSON file with the endpoint list"))
                .args(header_args())
                .arg(Arg::new("delay")
                    .long("delay")
                    .num_args(1)
                    .default_value("0.2")
                    .help("Delay in seconds between requests"))
                .arg(Arg::new("output")
                    .short('o')
                    .long("output")
                    .num_args(1)
                    .help("Save full results to a JSON file"))
                .arg(Arg::new("csv")
                    .long("csv")
                    .action(ArgAction::SetTrue)
                    .help("Also export a timestamped CSV report")),
        )
        .subcommand(
            Command::new("extract")
                .about("Extract printable strings from a bytecode bundle")
                .arg(Arg::new("file")
                    .required(true)
                    .num_args(1)
                    .help("Path to the bundle (.hbc or index.android.bundle)"))
                .arg(Arg::new("min_length")
                    .long("min-length")
                    .num_args(1)
                    .default_value("4")
                    .help("Minimum string length"))
                .arg(Arg::new("filter_urls")
                    .long("filter-urls")
                    .action(ArgAction::SetTrue)
                    .help("Show only URLs"))
                .arg(Arg::new("filter_api")
                    .long("filter-api")
                    .action(ArgAction::SetTrue)
                    .help("Show only API paths"))
                .arg(Arg::new("filter_secrets")
                    .long("filter-secrets")
                    .action(ArgAction::SetTrue)
                    .help("Show potential secrets/keys"))
                .arg(Arg::new("output")
                    .short('o')
                    .long("output")
                    .num_args(1)
                    .help("Save results to a file"))
                .arg(Arg::new("targets_out")
                    .long("targets-out")
                    .num_args(1)
                    .help("Write extracted API paths as a probe target list")),
        )
        .subcommand(
            Command::new("introspect")
                .about("Dump a GraphQL schema and flag operations needing an auth check")
                .arg(Arg::new("url")
                    .required(true)
                    .num_args(1)
                    .help("GraphQL endpoint URL"))
                .args(header_args())
                .arg(Arg::new("output")
                    .short('o')
                    .long("output")
                    .num_args(1)
                    .help("Save full schema JSON to a file"))
                .arg(Arg::new("targets_out")
                    .long("targets-out")
                    .num_args(1)
                    .help("Write query operations as a probe target list"))
                .arg(Arg::new("quiet")
                    .short('q')
                    .long("quiet")
                    .action(ArgAction::SetTrue)
                    .help("Only print the summary")),
        )
}

fn parse_extra_headers(matches: &clap::ArgMatches) -> Result<Vec<(String, String)>, ScanError> {
    let mut headers = Vec::new();
    if let Some(values) = matches.get_many::<String>("header") {
        for spec in values {
            let (k, v) = spec.split_once(':').ok_or_else(|| {
                ScanError::Config(format!("malformed header {:?}, expected \"Key: Value\"", spec))
            })?;
            headers.push((k.trim().to_string(), v.trim().to_string()));
        }
    }
    Ok(headers)
}

async fn run_probe(matches: &clap::ArgMatches) -> Result<bool, ScanError> {
    let base_url = matches.get_one::<String>("base_url").expect("base_url is required");
    let endpoints_path = matches.get_one::<String>("endpoints").expect("endpoints is required");
    let delay_secs: f64 = matches
        .get_one::<String>("delay")
        .expect("delay has a default")
        .parse()
        .map_err(|_| ScanError::Config("delay must be a number of seconds".to_string()))?;
    if delay_secs < 0.0 {
        return Err(ScanError::Config("delay must be non-negative".to_string()));
    }

    let extra_headers = parse_extra_headers(matches)?;
    let anon = CredentialContext::anonymous(extra_headers.clone());
    let auth = matches
        .get_one::<String>("token")
        .map(|t| CredentialContext::bearer(t.clone(), extra_headers));

    let parsed = load_target_list(endpoints_path)?;
    for warning in &parsed.warnings {
        eprintln!("warning: {}", warning);
    }

    let prober = HttpProber::new(base_url, PROBE_TIMEOUT)?;
    let runner = DifferentialRunner::new(prober, Duration::from_secs_f64(delay_secs));

    // Ctrl-C stops the run at the next target boundary; records already
    // printed stand as-is.
    let cancel = runner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received, stopping after current target");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let mut reporter = ConsoleReporter;
    reporter.print_header(parsed.endpoints.len(), base_url);
    let records = runner
        .run(&parsed.endpoints, &anon, auth.as_ref(), &mut reporter)
        .await;

    let summary = Summary::of(&records);
    reporter.print_summary(&summary);

    if let Some(path) = matches.get_one::<String>("output") {
        save_json(path, &records)?;
        println!("\n[*] Full results saved to {}", path);
    }
    if matches.get_flag("csv") {
        let filename = export_csv(&records)?;
        println!("[*] CSV report saved to {}", filename);
    }

    Ok(summary.has_leaks())
}

fn run_extract(matches: &clap::ArgMatches) -> Result<(), ScanError> {
    let file = matches.get_one::<String>("file").expect("file is required");
    let min_length: usize = matches
        .get_one::<String>("min_length")
        .expect("min_length has a default")
        .parse()
        .map_err(|_| ScanError::Config("min-length must be a positive integer".to_string()))?;

    println!("[*] Extracting strings from {}", file);
    let strings = extract::extract_from_file(file, min_length)?;
    println!("[*] Found {} strings (min length {})", strings.len(), min_length);

    let filtered = if matches.get_flag("filter_urls") {
        let urls = extract::filter_urls(&strings);
        println!("[*] URLs found: {}", urls.len());
        urls
    } else if matches.get_flag("filter_api") {
        let paths = extract::filter_api_paths(&strings);
        println!("[*] API paths found: {}", paths.len());
        paths
    } else if matches.get_flag("filter_secrets") {
        let secrets = extract::filter_secrets(&strings);
        println!("[*] Potential secrets found: {}", secrets.len());
        secrets
    } else {
        strings.clone()
    };

    match matches.get_one::<String>("output") {
        Some(path) => {
            std::fs::write(path, filtered.join("\n"))?;
            println!("[*] Saved {} strings to {}", filtered.len(), path);
        }
        None => {
            for s in &filtered {
                println!("{}", s);
            }
        }
    }

    if let Some(path) = matches.get_one::<String>("targets_out") {
        let targets = extract::paths_to_targets(&extract::filter_api_paths(&strings));
        std::fs::write(path, serde_json::to_string_pretty(&targets).unwrap_or_default())?;
        println!("[*] Wrote {} probe targets to {}", targets.len(), path);
    }

    // No filter selected: close with a census of what a filtered pass would find.
    if !matches.get_flag("filter_urls")
        && !matches.get_flag("filter_api")
        && !matches.get_flag("filter_secrets")
    {
        println!("\n--- Summary ---");
        println!("URLs:              {}", extract::filter_urls(&strings).len());
        println!("API paths:         {}", extract::filter_api_paths(&strings).len());
        println!("Potential secrets: {}", extract::filter_secrets(&strings).len());
        println!("\nRe-run with --filter-urls, --filter-api, or --filter-secrets for details.");
    }

    Ok(())
}

/// Path component of a URL, for pairing introspected operations with the
/// probe subcommand's base-URL + path convention.
fn url_path(url: &str) -> &str {
    let rest = url.splitn(2, "://").nth(1).unwrap_or(url);
    match rest.find('/') {
        Some(i) => &rest[i..],
        None => "/graphql",
    }
}

async fn run_introspect(matches: &clap::ArgMatches) -> Result<(), ScanError> {
    let url = matches.get_one::<String>("url").expect("url is required");
    let extra_headers = parse_extra_headers(matches)?;
    let ctx = match matches.get_one::<String>("token") {
        Some(t) => {
            println!("[*] Using auth token: {}...", t.chars().take(20).collect::<String>());
            CredentialContext::bearer(t.clone(), extra_headers)
        }
        None => {
            println!("[*] No auth token, testing anonymous access");
            CredentialContext::anonymous(extra_headers)
        }
    };

    println!("[*] Introspecting {}", url);
    let client = IntrospectionClient::new(INTROSPECT_TIMEOUT)?;
    let response = client.introspect(url, &ctx).await?;

    if let Some(errors) = response.get("errors") {
        println!(
            "[!] Errors: {}",
            serde_json::to_string_pretty(errors).unwrap_or_default()
        );
    }

    match parse_schema(&response) {
        Some(summary) => {
            println!("[+] Introspection ENABLED\n");
            if !matches.get_flag("quiet") {
                println!("{}", summary.render());
            }
            if let Some(path) = matches.get_one::<String>("targets_out") {
                let graphql_path = url_path(url);
                let targets =
                    authdiff::introspect::operations_as_targets(graphql_path, &summary.queries);
                std::fs::write(path, serde_json::to_string_pretty(&targets).unwrap_or_default())?;
                println!("\n[*] Wrote {} probe targets to {}", targets.len(), path);
            }
        }
        None => println!("[-] Introspection blocked or no schema returned"),
    }

    if let Some(path) = matches.get_one::<String>("output") {
        std::fs::write(path, serde_json::to_string_pretty(&response).unwrap_or_default())?;
        println!("\n[*] Full schema saved to {}", path);
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    let result = match matches.subcommand() {
        Some(("probe", sub)) => run_probe(sub).await.map(|leaks| {
            if leaks {
                // At least one endpoint returned data anonymously.
                std::process::exit(1);
            }
        }),
        Some(("extract", sub)) => run_extract(sub),
        Some(("introspect", sub)) => run_introspect(sub).await,
        _ => unreachable!("subcommand is required"),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(2);
    }
}
