use std::io::{self, BufRead};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use mailprobe::{MailboxStatus, Verifier, VerifyOptions, VerifyReport};

/// Probe mailbox deliverability by talking SMTP to the domain's MX hosts.
#[derive(Parser)]
#[command(name = "mailprobe-cli")]
struct Cli {
    /// address to verify (omit when using --stdin)
    email: Option<String>,

    /// read addresses from stdin (one per line)
    #[arg(long)]
    stdin: bool,

    /// output format: human|json
    #[arg(long, default_value = "human")]
    format: String,

    /// FQDN announced in EHLO/HELO
    #[arg(long)]
    helo: Option<String>,

    /// envelope MAIL FROM (an empty string selects the null sender <>)
    #[arg(long = "from")]
    mail_from: Option<String>,

    /// per-step SMTP timeout (ms)
    #[arg(long = "timeout", default_value_t = 15_000)]
    timeout_ms: u64,

    /// maximum verification attempts
    #[arg(long = "max-attempts", default_value_t = 3)]
    max_attempts: u32,

    /// SMTP port (mail servers listen on 25)
    #[arg(long, default_value_t = 25)]
    port: u16,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = VerifyOptions {
        port: cli.port,
        helo_name: cli.helo.clone(),
        envelope_sender: cli.mail_from.clone(),
        smtp_timeout: Duration::from_millis(cli.timeout_ms),
        max_attempts: cli.max_attempts,
        ..VerifyOptions::default()
    };
    let verifier = Verifier::new(options).context("initialize resolver")?;

    let mut reports: Vec<VerifyReport> = Vec::new();
    if cli.stdin {
        for line in io::stdin().lock().lines() {
            let email = line.context("read stdin")?;
            let email = email.trim();
            if email.is_empty() {
                continue;
            }
            reports.push(verifier.verify(email));
        }
    } else if let Some(email) = &cli.email {
        reports.push(verifier.verify(email));
    } else {
        bail!("provide an address or --stdin");
    }

    match cli.format.as_str() {
        "human" => {
            for report in &reports {
                print_human(report);
            }
        }
        "json" => {
            #[cfg(feature = "with-serde")]
            println!("{}", serde_json::to_string_pretty(&reports)?);
            #[cfg(not(feature = "with-serde"))]
            {
                eprintln!("format=json requires the 'with-serde' feature");
                std::process::exit(1);
            }
        }
        other => bail!("unknown --format '{other}', use: human|json"),
    }

    // exit codes: 0 OK, 2 at least one invalid address, 1 fatal
    if reports
        .iter()
        .any(|report| report.status == MailboxStatus::Invalid)
    {
        std::process::exit(2);
    }
    Ok(())
}

fn print_human(report: &VerifyReport) {
    println!(
        "[{}] {} :: code={} mx={} attempts={} time={}ms",
        report.status,
        report.email,
        report.smtp_code,
        report.mx_server,
        report.attempts,
        report.time_taken_ms
    );
    println!("        reason: {}", report.reason);
    if report.is_catch_all {
        println!("        catch-all domain");
    }
    if report.is_temporary_error {
        println!("        temporary: a later retry may succeed");
    }
}
