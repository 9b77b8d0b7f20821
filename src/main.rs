//! Writingway - command-line front end for the LLM provider layer
//!
//! Lists providers and models, tests connections, and sends blocking or
//! streaming prompts through `writingway-core`.

mod args;
mod error;

use args::{Args, Command, USAGE};
use crossbeam_channel::{select, unbounded};
use error::{AppError, Result};
use std::io::Write;
use std::sync::{Arc, Once};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use writingway_core::config::{load_config, load_from_file};
use writingway_core::{
    LlmAggregator, ModelCatalog, ModelDescriptor, Overrides, ProviderRegistry, SharedSettings,
    StreamingWorker, WorkerEvent,
};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing subscriber (only once)
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG")
                    .unwrap_or_else(|_| "writingway=info,writingway_core=warn".into()),
            ))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    });
}

fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse()?;
    if args.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => load_from_file(path)?,
        None => load_config(&std::env::current_dir()?)?,
    };
    let settings = SharedSettings::new(config.llm);
    let llm = Arc::new(LlmAggregator::new(ProviderRegistry::new(Arc::new(
        settings.clone(),
    ))));

    match args.command {
        Command::Providers => list_providers(&settings),
        Command::Models { name, refresh } => list_models(&llm, &name, refresh),
        Command::Test { name } => test_provider(&llm, &name),
        Command::Ask {
            prompt,
            provider,
            model,
        } => {
            let reply = llm.send_prompt(&prompt, &overrides(provider, model), None)?;
            println!("{}", reply);
            Ok(())
        }
        Command::Stream {
            prompt,
            provider,
            model,
        } => stream(llm, prompt, overrides(provider, model)),
        Command::Help => Ok(()),
    }
}

fn overrides(provider: Option<String>, model: Option<String>) -> Overrides {
    Overrides {
        provider,
        model,
        ..Overrides::default()
    }
}

fn list_providers(settings: &SharedSettings) -> Result<()> {
    println!("Provider kinds: {}", ProviderRegistry::provider_kinds().join(", "));
    println!();

    let snapshot = settings.snapshot();
    if snapshot.providers.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }

    for (name, config) in &snapshot.providers {
        let marker = if *name == snapshot.active_provider { "*" } else { " " };
        println!(
            "{} {:<20} {:<12} {:<28} {}",
            marker,
            name,
            config.provider,
            config.model().unwrap_or("-"),
            config.endpoint().unwrap_or("(default endpoint)")
        );
    }
    Ok(())
}

fn list_models(llm: &LlmAggregator, name: &str, refresh: bool) -> Result<()> {
    let provider = llm
        .registry()
        .get_provider(name)
        .ok_or_else(|| AppError::UnknownProvider(name.to_string()))?;
    let catalog = ModelCatalog::user_default();

    let cached = if refresh {
        None
    } else {
        catalog.as_ref().and_then(|c| c.load(name))
    };

    let models = match cached {
        Some(models) => {
            tracing::debug!(provider = %name, "Using cached model catalog");
            models
        }
        None => {
            let models = provider.list_models(refresh)?;
            if let Some(catalog) = &catalog {
                if !models.is_empty() {
                    if let Err(err) = catalog.store(name, &models) {
                        tracing::warn!(error = %err, "Failed to update model catalog");
                    }
                }
            }
            models
        }
    };

    print_models(&models);
    Ok(())
}

fn print_models(models: &[ModelDescriptor]) {
    if models.is_empty() {
        println!("No models available.");
        return;
    }
    for model in models {
        match model.context_length {
            Some(ctx) => println!("{:<48} {:<32} {:>9}", model.id, model.name, ctx),
            None => println!("{:<48} {}", model.id, model.name),
        }
    }
}

fn test_provider(llm: &LlmAggregator, name: &str) -> Result<()> {
    let provider = llm
        .registry()
        .get_provider(name)
        .ok_or_else(|| AppError::UnknownProvider(name.to_string()))?;

    if provider.test_connection(&Overrides::new()) {
        println!("{}: OK", name);
        Ok(())
    } else {
        Err(AppError::ConnectionFailed(name.to_string()))
    }
}

/// Stream a reply through the background worker until it finishes or the
/// user presses Ctrl+C.
fn stream(llm: Arc<LlmAggregator>, prompt: String, overrides: Overrides) -> Result<()> {
    let (interrupt_tx, interrupts) = unbounded();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })
    .map_err(|e| AppError::Signal(e.to_string()))?;

    let worker = StreamingWorker::new(llm, prompt, overrides, None);
    let events = worker.start()?;
    let mut stdout = std::io::stdout();

    loop {
        select! {
            recv(events) -> event => match event {
                Ok(WorkerEvent::Data(text)) => {
                    write!(stdout, "{}", text)?;
                    stdout.flush()?;
                }
                Ok(WorkerEvent::TokenLimitExceeded(text)) => {
                    eprintln!("\n[token limit exceeded] {}", text);
                }
                Ok(WorkerEvent::Finished) | Err(_) => break,
            },
            recv(interrupts) -> _ => {
                eprintln!("\n[interrupted]");
                worker.stop();
            }
        }
    }

    writeln!(stdout)?;
    Ok(())
}
