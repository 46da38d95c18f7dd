use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info, warn};
use plate_intake::{
    Client, Page, ResultPanel, SelectedImage, State, UploadWorkflow, VehicleDetails,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Register workshop vehicles from license-plate photos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a plate photo; only the first image given is used
    Scan {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// List vehicles on file
    List,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let host = env::var("WORKSHOP_HOST").unwrap_or_else(|_| "localhost:5000".to_string());
    let client = match Client::for_host(&host) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };
    info!("Starting plate-intake against {}", client.base());

    match cli.command {
        Command::Scan { images } => scan(client, images).await,
        Command::List => list(client).await,
    }
}

async fn list(client: Client) {
    match client.list_vehicles().await {
        Ok(vehicles) => {
            for v in vehicles {
                println!(
                    "{:>4}  {:<9} {:<20} {:<20} {:<25} {:<15} {}",
                    v.id,
                    v.plate,
                    v.record.owner_name,
                    v.record.vehicle_description,
                    v.record.owner_email,
                    v.record.status,
                    v.intake_date
                );
            }
        }
        Err(e) => {
            error!("Error listing vehicles: {}", e);
            std::process::exit(1);
        }
    }
}

async fn scan(client: Client, images: Vec<PathBuf>) {
    let path = &images[0];
    if images.len() > 1 {
        warn!("Ignoring {} extra image(s)", images.len() - 1);
    }
    let file = match SelectedImage::from_path(path).await {
        Ok(f) => f,
        Err(e) => {
            error!("Unable to read {:?}: {}", path, e);
            std::process::exit(1);
        }
    };

    let mut workflow = UploadWorkflow::new(client);
    if let Err(e) = workflow.select_image(file) {
        println!("{}", e);
        std::process::exit(1);
    }
    print_page(workflow.page());

    if let Err(e) = workflow.submit_for_recognition().await {
        println!("{}", e);
        std::process::exit(1);
    }
    print_page(workflow.page());

    while *workflow.state() == State::NewVehicleFormShown {
        let details = match prompt_details() {
            Ok(Some(d)) => d,
            Ok(None) => break,
            Err(e) => {
                error!("Error reading input: {}", e);
                break;
            }
        };
        if let Err(e) = workflow.submit_registration(details).await {
            println!("{}", e);
            break;
        }
        if let Some(notice) = &workflow.page().notice {
            println!("{}", notice);
        }
    }
}

fn print_page(page: &Page) {
    if let (Some(name), Some(preview)) = (&page.file_name, &page.preview) {
        match preview.dimensions {
            Some((w, h)) => println!("Image: {} ({}x{})", name, w, h),
            None => println!("Image: {}", name),
        }
    }
    match &page.result {
        ResultPanel::Empty => {}
        ResultPanel::ReadyToProcess => println!("Image loaded, processing plate..."),
        ResultPanel::Error(message) => println!("{}", message),
        ResultPanel::NoPlate { tips } => {
            println!("No plate detected. Try a clearer picture of the plate:");
            for tip in tips {
                println!("  - {}", tip);
            }
        }
        ResultPanel::Registered { plate } => println!("{}  ALREADY REGISTERED", plate),
        ResultPanel::NewVehicle { plate } => println!("{}  NEW VEHICLE", plate),
    }
    if let Some(record) = &page.vehicle_info {
        println!("  Owner:   {}", record.owner_name);
        println!("  Vehicle: {}", record.vehicle_description);
        println!("  Fault:   {}", record.fault_description);
        println!("  Email:   {}", record.owner_email);
        println!("  Status:  {}", record.status);
    }
}

/// Reads the new-vehicle form from stdin. `None` when the user gives up
/// (end of input or an empty owner name).
fn prompt_details() -> io::Result<Option<VehicleDetails>> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut ask = |label: &str| -> io::Result<Option<String>> {
        print!("{}: ", label);
        io::stdout().flush()?;
        lines.next().transpose().map(|l| l.map(|s| s.trim().to_string()))
    };
    let owner_name = match ask("Owner")? {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(None),
    };
    let vehicle_description = ask("Vehicle")?.unwrap_or_default();
    let fault_description = ask("Fault")?.unwrap_or_default();
    let owner_email = ask("Email")?.unwrap_or_default();
    Ok(Some(VehicleDetails {
        owner_name,
        vehicle_description,
        fault_description,
        owner_email,
    }))
}
