use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "certify-cli")]
#[command(about = "Operator CLI for the certification gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway and chain reachability
    Health,
    /// Estimate fees for a batch of operations
    Price {
        #[arg(long, default_value_t = 0)]
        signer_create: u64,
        #[arg(long, default_value_t = 0)]
        institution_create: u64,
        #[arg(long, default_value_t = 0)]
        signer_add: u64,
        #[arg(long, default_value_t = 0)]
        participant_add: u64,
    },
    /// Look up an institution (or a corporate with --corporate)
    Institution {
        id: u64,
        #[arg(long)]
        corporate: bool,
    },
    /// Look up a certificate
    Certificate {
        #[arg(long)]
        owner: u64,
        id: u64,
    },
    /// Look up a participant on a certificate
    Participant {
        #[arg(long)]
        institution: u64,
        #[arg(long)]
        certificate: u64,
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Price {
            signer_create,
            institution_create,
            signer_add,
            participant_add,
        } => {
            client
                .post(format!("{}/calculateprice", base))
                .json(&json!({
                    "signer_create": signer_create,
                    "institution_create": institution_create,
                    "signer_add": signer_add,
                    "participant_add": participant_add,
                }))
                .send()
                .await?
        }
        Commands::Institution { id, corporate } => {
            let (path, param) = if corporate {
                ("getcorporate", "corporateId")
            } else {
                ("getinstitution", "institutionId")
            };
            client
                .get(format!("{}/{}", base, path))
                .query(&[(param, id.to_string())])
                .send()
                .await?
        }
        Commands::Certificate { owner, id } => {
            client
                .get(format!("{}/getcertificate", base))
                .query(&[("institutionId", owner.to_string()), ("certificateId", id.to_string())])
                .send()
                .await?
        }
        Commands::Participant {
            institution,
            certificate,
            name,
        } => {
            client
                .get(format!("{}/getparticipant", base))
                .query(&[
                    ("institutionId", institution.to_string()),
                    ("certificateId", certificate.to_string()),
                    ("participantName", name),
                ])
                .send()
                .await?
        }
    };

    print_response(res).await
}

/// Every gateway answer is an envelope; print it whatever the status.
async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        std::process::exit(1);
    }
    Ok(())
}
