//! `bariatric chat`: Interactive or single-message chat mode.
//!
//! The rolling conversation log is carried between turns in-process, the
//! way an HTTP client would send it back. The memory summary is read back
//! from the profile store each turn.

use std::io::Write;

use bariatric_agent::{BackgroundTask, Pipeline, TurnOutcome, TurnRequest};
use bariatric_config::AppConfig;
use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    user_id: String,
    debug: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let pipeline = bariatric_agent::build_pipeline(&config)?;
    let mut session = Session::new(user_id, debug);

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let outcome = session.turn(&pipeline, msg).await;
        eprint!("\r              \r");
        print_answer(&outcome, false);
        session.track(outcome);
        session.finish().await;
        return Ok(());
    }

    println!();
    println!("  Bariatric GPT, interactive mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!(
        "  Knowledge: {}",
        config.knowledge.index_path.as_deref().unwrap_or("none")
    );
    println!("  User:      {}", session.user_id);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
            break;
        }

        eprint!("  ...");
        let outcome = session.turn(&pipeline, line.to_string()).await;
        eprint!("\r     \r");
        println!();
        print_answer(&outcome, true);
        println!();
        session.track(outcome);

        prompt()?;
    }

    session.finish().await;
    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

/// State a client carries between turns.
struct Session {
    user_id: String,
    debug: bool,
    conversation_log: Option<Value>,
    pending: Vec<BackgroundTask>,
}

impl Session {
    fn new(user_id: String, debug: bool) -> Self {
        Self {
            user_id,
            debug,
            conversation_log: None,
            pending: Vec::new(),
        }
    }

    async fn turn(&mut self, pipeline: &Pipeline, message: String) -> TurnOutcome {
        // the previous turn's memory write must land before it is read back
        for task in self.pending.drain(..) {
            task.wait().await;
        }
        let mut request = TurnRequest::new(self.user_id.clone(), message);
        request.conversation_log = self.conversation_log.take();
        request.debug = self.debug;
        pipeline.run_turn(request).await
    }

    fn track(&mut self, outcome: TurnOutcome) {
        self.conversation_log = Some(Value::String(outcome.response.conversation_log));
        if let Some(task) = outcome.background {
            self.pending.push(task);
        }
    }

    /// Let in-flight memory updates land before the process exits.
    async fn finish(self) {
        for task in self.pending {
            task.wait().await;
        }
    }
}

fn print_answer(outcome: &TurnOutcome, prefixed: bool) {
    let response = &outcome.response;
    for line in response.response_text.lines() {
        if prefixed {
            println!("  Assistant > {line}");
        } else {
            println!("{line}");
        }
    }
    if let Some(debug) = &response.debug {
        match serde_json::to_string_pretty(debug) {
            Ok(pretty) => eprintln!("{pretty}"),
            Err(e) => eprintln!("  [debug output unavailable: {e}]"),
        }
    }
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}
