use clap::Parser;
use commute_advisor::config::Command;
use commute_advisor::core::{CommuterProfile, LanguageModel};
use commute_advisor::utils::error::ErrorSeverity;
use commute_advisor::utils::{logger, validation::Validate};
use commute_advisor::{
    ChatSession, CliConfig, ConversationOrchestrator, CrowdingContext, CrowdingEstimator,
    GeminiClient, LocalStorage, ProfileStore, RecommendationEngine, Result, TomlConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting commute-advisor");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: CliConfig) -> Result<()> {
    let mut config = TomlConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let scale = config.score_scale();
    let storage = LocalStorage::new(".".to_string());
    let store = ProfileStore::load(&storage, &config.dataset.path, scale).await?;

    let estimator =
        CrowdingEstimator::new(config.simulation_params(), scale)?.with_population(store.iter());
    let engine = RecommendationEngine::new(scale);

    match &cli.command {
        Command::Profiles => {
            for profile in store.iter() {
                let mode = profile
                    .usual_mode
                    .as_ref()
                    .map(|mode| mode.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}", profile.id, mode);
            }
        }
        Command::Show { id } => {
            println!("{}", store.get(id)?.summary());
        }
        Command::Simulate { trip, .. } => {
            let insights = estimator.simulate(&trip.context())?;
            println!("Crowding level:        {}", insights.level);
            println!("Demand load:           {:.0}%", insights.demand_load * 100.0);
            println!("Average load:          {:.0}%", insights.average_load * 100.0);
            println!("Final load:            {:.0}%", insights.final_load * 100.0);
            println!("Switches from transit: {}", insights.mode_switches);
            println!(
                "(capacity {}, {} steps)",
                insights.capacity, insights.steps
            );
        }
        Command::Advise { id, trip } => {
            let profile = store.get(id)?;
            let context = context_for(trip.context(), profile);
            let insights = estimator.simulate(&context)?;
            let briefing = engine.briefing(profile, &insights)?;
            println!("{}", briefing.to_markdown());
        }
        Command::Chat { id, trip } => {
            let model = GeminiClient::new(config.gemini_config()?)?;
            let orchestrator =
                ConversationOrchestrator::new(estimator, engine, model, config.prompt_settings());
            let mut session = ChatSession::new(
                format!("cli-{}", chrono::Utc::now().format("%Y%m%d%H%M%S")),
                config.chat.local_recommendations,
            );
            session.set_context(trip.context());
            if let Some(id) = id {
                session.select_profile(store.get(id)?.clone());
            }
            chat_loop(&orchestrator, &store, &mut session).await?;
        }
    }

    Ok(())
}

fn context_for(mut context: CrowdingContext, profile: &CommuterProfile) -> CrowdingContext {
    if context.route.is_none() {
        context.route = profile.route.clone();
    }
    context
}

fn print_latest(session: &ChatSession) {
    if let Some(turn) = session.transcript().last() {
        println!("\nBot: {}\n", turn.text);
    }
}

async fn chat_loop<M: LanguageModel>(
    orchestrator: &ConversationOrchestrator<M>,
    store: &ProfileStore,
    session: &mut ChatSession,
) -> Result<()> {
    eprintln!("🚌 Commute AI Assistant ({})", orchestrator.model().model_name());
    eprintln!("   Commands: /profiles, /profile <id>, /clear, /quit\n");
    print_latest(session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "/quit" | "/exit" => break,
            "/profiles" => {
                let ids: Vec<&str> = store.ids().collect();
                println!("{}", ids.join(", "));
            }
            "/clear" => {
                session.clear_profile();
                print_latest(session);
            }
            _ if line.starts_with("/profile ") => {
                let id = line["/profile ".len()..].trim();
                match store.get(id) {
                    Ok(profile) => {
                        session.select_profile(profile.clone());
                        print_latest(session);
                    }
                    Err(e) => eprintln!("❌ {}", e.user_friendly_message()),
                }
            }
            _ => match session.send(orchestrator, line).await {
                Ok(reply) => println!("\nBot: {}\n", reply),
                Err(e) if e.is_transient() => {
                    eprintln!("❌ {}", e.user_friendly_message());
                    eprintln!("💡 {}", e.recovery_suggestion());
                }
                Err(e) => return Err(e),
            },
        }
        eprint!("> ");
    }

    tracing::info!("Chat session {} ended", session.id());
    Ok(())
}
