use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use invoice_form::config;
use invoice_form::invoice_gen::InvoiceGenerator;
use invoice_form::logging;
use invoice_form::models::InvoiceHeader;
use invoice_form::ui::invoice_form::{
    InvoiceFormAction, InvoiceFormState, handle_input, render_invoice_form,
};

/// Fill in an invoice in the terminal and render it into a docx template.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Template URL or path (overrides INVOICE_TEMPLATE_PATH)
    #[arg(long)]
    template: Option<String>,

    /// Directory for generated invoices (overrides INVOICE_OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// File that receives log output
    #[arg(long, default_value = "invoice_form.log")]
    log_file: PathBuf,
}

// Main application state
struct AppState {
    generator: InvoiceGenerator,
    form: InvoiceFormState,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::init()?.with_overrides(cli.template, cli.output_dir);
    logging::init(&cli.log_file)?;
    info!(
        template = config.template().unwrap_or("<unset>"),
        output_dir = %config.output_dir().display(),
        "starting invoice form"
    );

    let mut app_state = AppState {
        generator: InvoiceGenerator::new(
            config.template().map(str::to_string),
            config.output_dir(),
        ),
        form: InvoiceFormState::new(InvoiceHeader::default()),
    };

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the main app loop
    let result = run_app(&mut terminal, &mut app_state).await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // Show any error message
    if let Err(err) = result {
        error!(error = %err, "invoice form stopped");
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app_state: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| render_invoice_form(f, &mut app_state.form))?;

        match handle_input(&mut app_state.form)? {
            Some(InvoiceFormAction::Quit) => break,
            Some(InvoiceFormAction::Generate) => generate_document(app_state).await,
            None => {}
        }
    }

    info!("invoice form closed");
    Ok(())
}

async fn generate_document(app_state: &mut AppState) {
    let result = app_state
        .generator
        .generate(app_state.form.header(), app_state.form.ledger())
        .await;

    match result {
        Ok(path) => app_state.form.report_generated(&path),
        Err(err) => app_state.form.report_error(&err),
    }
}
