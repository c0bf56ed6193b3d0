use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use client::{endpoints, load_dotenv, ApiClient, Method, RequestSpec, Settings};
use harness::{
    admin_auth_token, init_logging, search_bug_report, CaseFilter, RunReport, SuiteRegistry,
    UserManager,
};
use serde_json::json;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "End-to-end API tests for the Teresa UAT backend")]
struct Cli {
    /// Environment file loaded before reading settings
    #[arg(long, default_value = ".env", global = true)]
    env_file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run case tables and scenarios
    Run {
        /// Only this suite (see `list`)
        #[arg(short, long)]
        suite: Option<String>,
        /// Only cases carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Only the case with this id
        #[arg(short, long)]
        id: Option<String>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List suites and their cases
    List {
        #[arg(short, long)]
        suite: Option<String>,
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Show the effective settings
    Settings,
    /// Register one user by hand for manual verification
    Verify,
    /// Time the health endpoint and one registration
    Speed,
    /// Check whether technique search filters results
    SearchBug,
    /// List recent automation users in the whitelist
    Users,
}

fn banner(title: &str, settings: &Settings) {
    println!("{}", "=".repeat(70));
    println!("{}", title);
    println!("Environment: {}", settings.environment);
    println!("Base URL: {}", settings.base_url);
    println!("Time: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("{}", "=".repeat(70));
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let dotenv = load_dotenv(&cli.env_file);
    let settings = Settings::from_env()?;
    let _guard = init_logging(&settings)?;
    match dotenv {
        Ok(loaded) => info!("{} variables loaded from {}", loaded, cli.env_file),
        Err(e) => warn!("{}. Using default settings", e),
    }

    match cli.command {
        Commands::Run {
            suite,
            tag,
            id,
            json,
        } => run(&settings, suite, CaseFilter { tag, id }, json).await,
        Commands::List { suite, tag } => list(suite.as_deref(), tag.as_deref()),
        Commands::Settings => {
            for line in settings.summary() {
                println!("{}", line);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify => verify(&settings).await,
        Commands::Speed => speed(&settings).await,
        Commands::SearchBug => search_bug(&settings).await,
        Commands::Users => users(&settings).await,
    }
}

async fn run(
    settings: &Settings,
    suite: Option<String>,
    filter: CaseFilter,
    json: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let registry = SuiteRegistry::with_defaults();
    let names: Vec<String> = match suite {
        Some(name) => vec![name],
        None => registry.list_suites().iter().map(|s| s.to_string()).collect(),
    };

    banner("UAT API TEST SESSION STARTED", settings);
    let mut run = RunReport::new(&settings.environment, &settings.base_url);

    for name in &names {
        let report = registry.run(name, settings, &filter).await?;
        println!("\n[{}]", report.suite);
        for case in &report.cases {
            println!("  {}", case);
        }
        run.suites.push(report);
    }

    println!();
    banner("UAT API TEST SESSION FINISHED", settings);
    println!("{}", run);
    if json {
        println!("{}", run.to_json()?);
    }

    if run.has_failures() {
        error!("Run finished with failures");
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn list(suite: Option<&str>, tag: Option<&str>) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let registry = SuiteRegistry::with_defaults();
    let filter = CaseFilter {
        tag: tag.map(str::to_string),
        id: None,
    };

    for name in registry.list_suites() {
        if suite.is_some_and(|s| s != name) {
            continue;
        }
        let Some(entry) = registry.get_suite(name) else {
            continue;
        };
        let cases = entry.cases();
        println!("{} - {}", name, entry.description());
        for case in filter.select(&cases) {
            match case.skip {
                Some(reason) => println!("  {:<26} {} [skipped: {}]", case.id, case.description, reason),
                None => println!("  {:<26} {}", case.id, case.description),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn verify(settings: &Settings) -> Result<ExitCode, Box<dyn std::error::Error>> {
    banner("MANUAL UAT REGISTRATION", settings);
    let client = ApiClient::new(settings)?;
    let ts = Utc::now().timestamp();
    let body = json!({
        "f_name": "ManualUAT",
        "l_name": format!("TEST_{}", ts),
        "phone": format!("+88017{:08}", ts % 100_000_000),
        "email": format!("manual_uat_{}@test.com", ts),
        "password": "TestPass123!",
        "frontend_url": "https://uat.teresaapp.com/verify",
    });
    println!("Registering {}", body["email"]);

    let response = client.post(endpoints::REGISTER, body).await?;
    println!("Status: {} ({} ms)", response.status, response.elapsed.as_millis());
    println!("{}", response.preview(500));

    if response.status == 201 {
        println!("Registered. Check the whitelist audit for the new entry.");
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn speed(settings: &Settings) -> Result<ExitCode, Box<dyn std::error::Error>> {
    banner("API SPEED CHECK", settings);
    let client = ApiClient::new(&settings.clone().with_request_delay(Duration::ZERO))?;

    let start = Instant::now();
    let health = client
        .request(
            Method::GET,
            endpoints::HEALTH,
            RequestSpec::new().timeout(Duration::from_secs(10)),
        )
        .await;
    match health {
        Ok(response) => println!(
            "GET {}: {} in {:.2}s",
            endpoints::HEALTH,
            response.status,
            start.elapsed().as_secs_f64()
        ),
        Err(e) => println!("GET {} failed: {}", endpoints::HEALTH, e),
    }

    let ts = Utc::now().timestamp();
    let body = json!({
        "f_name": "Speed",
        "l_name": "Test",
        "phone": format!("+88017{:08}", ts % 100_000_000),
        "email": format!("speed_test_{}@test.com", ts),
        "password": "Test@123",
        "frontend_url": "https://uat.teresaapp.com/verify",
    });
    let start = Instant::now();
    let registration = client
        .request(
            Method::POST,
            endpoints::REGISTER,
            RequestSpec::new().json(body).timeout(Duration::from_secs(30)),
        )
        .await;
    match registration {
        Ok(response) => {
            println!(
                "POST {}: {} in {:.2}s",
                endpoints::REGISTER,
                response.status,
                start.elapsed().as_secs_f64()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("POST {} failed: {}", endpoints::REGISTER, e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn search_bug(settings: &Settings) -> Result<ExitCode, Box<dyn std::error::Error>> {
    banner("TECHNIQUE SEARCH CHECK", settings);
    let client = ApiClient::new(settings)?;
    let Some(token) = admin_auth_token(&client, settings).await else {
        println!("Admin login failed; cannot query techniques");
        return Ok(ExitCode::FAILURE);
    };

    let report = search_bug_report(&client, &token).await?;
    println!("{}", report);
    Ok(if report.bug_confirmed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn users(settings: &Settings) -> Result<ExitCode, Box<dyn std::error::Error>> {
    banner("RECENT TEST USERS", settings);
    let client = ApiClient::new(settings)?;
    let mut manager = UserManager::new(&client, settings);

    let entries = manager.find_recent_test_users_in_whitelist().await?;
    if entries.is_empty() {
        println!("No test users found in the whitelist");
    }
    for entry in entries {
        println!(
            "  {:<40} {:<16} {}",
            entry.email.as_deref().unwrap_or("-"),
            entry.phone.as_deref().unwrap_or("-"),
            entry.status.as_deref().unwrap_or("-")
        );
    }
    Ok(ExitCode::SUCCESS)
}
