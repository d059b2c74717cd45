use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "compose-cli")]
#[command(about = "Send composed requests to a running request-composer", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8900")]
    server: String,

    /// Client id forwarded as x-whistle-client-id
    #[arg(long)]
    client_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose and send one request
    Send {
        url: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Header line, repeatable ("Name: value")
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        #[arg(short, long)]
        data: Option<String>,

        /// Treat --data as base64
        #[arg(long)]
        base64: bool,

        /// Gzip the body before sending
        #[arg(long)]
        gzip: bool,

        #[arg(long)]
        h2: bool,

        /// Do not record in history
        #[arg(long)]
        no_store: bool,

        /// Return immediately instead of waiting for the response
        #[arg(long)]
        detach: bool,
    },
    /// List the compose history
    History,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(id) = &cli.client_id {
        headers.insert("x-whistle-client-id", HeaderValue::from_str(id)?);
    }

    match cli.command {
        Commands::Send {
            url,
            method,
            headers: lines,
            data,
            base64,
            gzip,
            h2,
            no_store,
            detach,
        } => {
            let mut body = json!({
                "url": url,
                "method": method,
                "headers": lines.join("\r\n"),
                "isGzip": gzip,
                "useH2": h2,
                "noStore": no_store,
                "needResponse": !detach,
            });
            if let Some(data) = data {
                body[if base64 { "base64" } else { "body" }] = Value::String(data);
            }
            let res = client
                .post(format!("{}/cgi-bin/composer", cli.server))
                .headers(headers)
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::History => {
            let res = client
                .get(format!("{}/cgi-bin/history", cli.server))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: composer returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
