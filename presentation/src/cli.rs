use crate::context::{build_providers, AppContext};
use crate::server;
use anyhow::Context;
use application::{ChatReply, ChatRequest, IndexReport, IndexService};
use clap::{Parser, Subcommand};
use colored::Colorize;
use domain::RankedResult;
use infrastructure::config::Config;
use serde_json::json;
use shared::confirmation::ask_confirmation;
use shared::types::Result;
use shared::utils::preview;
use std::path::PathBuf;
use tokio::sync::Mutex;

#[derive(Parser)]
#[command(name = "dmrc-faq")]
#[command(about = "Delhi Metro FAQ assistant with retrieval-augmented answers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Embed the FAQ file and persist the index
    Index {
        /// FAQ JSON file (defaults to FAQ_PATH)
        #[arg(long)]
        faq: Option<PathBuf>,
        /// Re-embed even when the source is unchanged
        #[arg(long)]
        force: bool,
        /// Do not ask before replacing an index built with another model
        #[arg(long, short)]
        yes: bool,
    },
    /// Answer a single question
    Ask {
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
        /// Print the reply as JSON
        #[arg(long)]
        json: bool,
        #[arg(trailing_var_arg = true, required = true)]
        question: Vec<String>,
    },
    /// Show the closest FAQ entries without calling the language model
    Search {
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
        #[arg(trailing_var_arg = true, required = true)]
        query: Vec<String>,
    },
    /// Interactive conversation with session memory
    Chat {
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Serve the HTTP API
    Serve {
        /// Address to bind (defaults to BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,
    },
}

pub struct CliApp {
    config: Config,
}

impl CliApp {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&mut self, cli: Cli) -> Result<()> {
        match cli.command {
            Command::Index { faq, force, yes } => self.handle_index(faq, force, yes).await,
            Command::Ask {
                top_k,
                threshold,
                json,
                question,
            } => self.handle_ask(&question.join(" "), top_k, threshold, json).await,
            Command::Search {
                top_k,
                threshold,
                query,
            } => self.handle_search(&query.join(" "), top_k, threshold).await,
            Command::Chat { top_k, threshold } => self.handle_chat(top_k, threshold).await,
            Command::Serve { bind } => self.handle_serve(bind).await,
        }
    }

    async fn handle_index(&self, faq: Option<PathBuf>, force: bool, yes: bool) -> Result<()> {
        let faq_path = faq.unwrap_or_else(|| self.config.faq_path.clone());
        let (embedder, _, _) = build_providers(&self.config)?;
        let configured = embedder.model_id().to_string();
        let service = IndexService::new(embedder, self.config.db_path.clone());

        let mut force = force;
        if let Some(stored) = service.stored_model()? {
            if stored != configured {
                let prompt = format!(
                    "Stored index was built with '{stored}'. Rebuild it with '{configured}'?"
                );
                if !yes && !ask_confirmation(&prompt, false)? {
                    println!("{}", "Index left unchanged.".yellow());
                    return Ok(());
                }
                force = true;
            }
        }

        println!("Indexing {}", faq_path.display().to_string().cyan());
        let (_, report) = service
            .build_from_path(&faq_path, force)
            .await
            .with_context(|| format!("indexing {}", faq_path.display()))?;
        print_report(&report, service.db_path());
        Ok(())
    }

    async fn handle_ask(
        &self,
        question: &str,
        top_k: Option<usize>,
        threshold: Option<f32>,
        as_json: bool,
    ) -> Result<()> {
        let ctx = AppContext::new(self.config.clone())?;
        let memory = Mutex::new(ctx.session_memory());
        let request = self.request(question, None, top_k, threshold, false);
        let reply = ctx.chat.answer(&memory, request).await?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&reply_json(&reply))?);
        } else {
            print_reply(&reply);
        }
        Ok(())
    }

    async fn handle_search(
        &self,
        query: &str,
        top_k: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<()> {
        let ctx = AppContext::new(self.config.clone())?;
        let results = ctx
            .chat
            .search(
                query,
                top_k.unwrap_or(self.config.top_k),
                threshold.or(self.config.similarity_threshold),
            )
            .await?;
        if results.is_empty() {
            println!("{}", "No matching FAQ entries.".yellow());
        }
        for result in &results {
            print_result(result);
        }
        Ok(())
    }

    async fn handle_chat(&self, top_k: Option<usize>, threshold: Option<f32>) -> Result<()> {
        use dialoguer::{theme::ColorfulTheme, Input};

        let ctx = AppContext::new(self.config.clone())?;
        let memory = Mutex::new(ctx.session_memory());
        let session_id = memory.lock().await.create_session(None);
        println!("Ask about Delhi Metro. Type 'exit' to quit, '/reset' to clear the conversation.");
        loop {
            let input: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("You")
                .interact_text()?;
            let input = input.trim();
            if input.eq_ignore_ascii_case("exit") {
                break;
            }
            if input == "/reset" {
                memory.lock().await.reset(&session_id);
                println!("{}", "Conversation cleared.".yellow());
                continue;
            }
            if input.is_empty() {
                continue;
            }

            let request = self.request(input, Some(session_id.clone()), top_k, threshold, true);
            match ctx.chat.answer(&memory, request).await {
                Ok(reply) => print_reply(&reply),
                Err(e) => println!("{} {}", "Error:".red().bold(), e),
            }
        }
        Ok(())
    }

    async fn handle_serve(&self, bind: Option<String>) -> Result<()> {
        let bind = bind.unwrap_or_else(|| self.config.bind_addr.clone());
        let ctx = AppContext::new(self.config.clone())?;
        let state = server::AppState::from_context(&ctx);
        println!("Serving DMRC FAQ API on {}", format!("http://{bind}").cyan());
        server::serve(state, &bind).await
    }

    fn request(
        &self,
        query: &str,
        session_id: Option<String>,
        top_k: Option<usize>,
        threshold: Option<f32>,
        memory_enabled: bool,
    ) -> ChatRequest {
        ChatRequest {
            query: query.to_string(),
            session_id,
            top_k: top_k.unwrap_or(self.config.top_k),
            threshold: threshold.or(self.config.similarity_threshold),
            memory_enabled,
        }
    }
}

fn print_report(report: &IndexReport, db_path: &std::path::Path) {
    if report.reused {
        println!(
            "{} {} entries already indexed with {}",
            "Unchanged:".green().bold(),
            report.entries,
            report.model
        );
        return;
    }
    println!(
        "{} {} entries ({} dims, {}) written to {}",
        "Indexed:".green().bold(),
        report.entries,
        report.dimension,
        report.model,
        db_path.display()
    );
    if report.skipped > 0 {
        println!(
            "{}",
            format!("Skipped {} blank or duplicate entries", report.skipped).yellow()
        );
    }
}

fn print_reply(reply: &ChatReply) {
    println!("\n{}", reply.response);
    println!(
        "{}",
        format!(
            "[{} | confidence {:.2} | session {}]",
            reply.source.as_str(),
            reply.confidence,
            reply.session_id
        )
        .dimmed()
    );
    for record in &reply.context {
        println!("  {} {}", "-".blue(), preview(&record.question, 80).dimmed());
    }
    println!();
}

fn print_result(result: &RankedResult) {
    println!(
        "{} {} {}",
        format!("[{:.3}]", result.score).green(),
        format!("#{}", result.position).blue(),
        result.entry.question.bold()
    );
    println!("    {}", preview(&result.entry.answer, 160));
}

pub fn reply_json(reply: &ChatReply) -> serde_json::Value {
    json!({
        "response": reply.response,
        "source": reply.source,
        "confidence": reply.confidence,
        "session_id": reply.session_id,
        "context": reply.context,
    })
}
