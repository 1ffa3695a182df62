use clap::{Parser, Subcommand};
use serde_json::Value;

use swift_api::client::ApiClient;
use swift_api::demo::{self, AuthRequest, AuthResponse, GreetRequest, GreetResponse};

#[derive(Parser)]
#[command(name = "api-cli")]
#[command(about = "Call the Swift API demo server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the server for a greeting
    Greet {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Try to log in
    Auth {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Call any declared route with a raw JSON body
    Call { route: String, body: String },
    /// List declared routes
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let api = demo::api();

    if let Commands::Routes = cli.command {
        for name in api.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let client = ApiClient::new(api, Some(&cli.url))?;

    match cli.command {
        Commands::Greet { name } => {
            let reply: GreetResponse = client.fetch(demo::GREET, &GreetRequest { name }).await?;
            println!("{}", reply.msg);
        }
        Commands::Auth { username, password } => {
            let reply: AuthResponse = client
                .fetch(demo::AUTH, &AuthRequest { username, password })
                .await?;
            if reply.logged_in {
                println!("Login was successful");
            } else {
                println!("Login failed");
            }
        }
        Commands::Call { route, body } => {
            let body: Value = serde_json::from_str(&body)?;
            let data = client.fetch_value(&route, body).await?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Commands::Routes => {}
    }

    Ok(())
}
