use crate::demo::{run_demo, DemoArgs};
use crate::infra::{
    load_policies, parse_role, parse_status, InMemoryApplicationRepository,
    InMemoryNotificationPublisher,
};
use clap::{Args, Parser, Subcommand};
use guarantee_flow::config::AppConfig;
use guarantee_flow::error::AppError;
use guarantee_flow::telemetry;
use guarantee_flow::workflows::guarantee::{
    ActionRegistry, Actor, Application, ApplicationId, BankAdapters, Dispatcher, GroupId, Offer,
    OfferId, PolicyTree, Role, StaticDirectory, StatusCode, StatusRegistry, WorkflowServices,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "guarantee-flow",
    about = "Inspect and demonstrate the bank guarantee workflow engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the status transition table as JSON
    Statuses,
    /// List the actions an actor may invoke on an application they own
    Actions(ActionsArgs),
    /// Fan one request out to several banks and accept a single offer (default command)
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ActionsArgs {
    /// Role of the synthetic actor (client, agent, verifier, bank, admin)
    #[arg(long, value_parser = parse_role)]
    pub(crate) role: Role,
    /// Current status of the synthetic application
    #[arg(long, value_parser = parse_status)]
    pub(crate) status: StatusCode,
    /// Attach an offer to the synthetic application
    #[arg(long)]
    pub(crate) with_offer: bool,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    info!(environment = ?config.environment, "guarantee-flow starting");

    let policies = load_policies(&config.workflow)?;
    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Statuses => print_statuses(),
        Command::Actions(args) => print_actions(args, policies),
        Command::Demo(args) => run_demo(args, policies),
    }
}

fn print_statuses() -> Result<(), AppError> {
    let table = StatusRegistry::standard().table();
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}

fn print_actions(args: ActionsArgs, policies: PolicyTree) -> Result<(), AppError> {
    let ActionsArgs {
        role,
        status,
        with_offer,
    } = args;

    let mut actor = Actor::new(format!("{}-1", role.label()), role);
    actor.client_id = Some("client-1".to_string());
    actor.agent_id = Some("agent-1".to_string());
    actor.bank_id = Some("bank-1".to_string());

    let mut application = Application::draft(
        ApplicationId("synthetic".to_string()),
        GroupId::generate(),
        "client-1",
    );
    application.agent_id = Some("agent-1".to_string());
    application.bank_id = Some("bank-1".to_string());
    application.verifier_id = Some(actor.id.clone());
    if with_offer {
        application.offer = Some(Offer {
            id: OfferId::generate(),
            amount: Decimal::new(1_000_000, 0),
            commission: Decimal::new(2, 0),
            term_days: 365,
            created_at: application.created_at,
        });
    }
    let changed_at = application.status_changed_at();
    let application = application.restore(status, changed_at);

    let directory = StaticDirectory::default()
        .with_member(Role::Verifier, "verifier-1", "Verifier One")
        .with_member(Role::Verifier, "verifier-2", "Verifier Two")
        .with_member(Role::Agent, "agent-1", "Agent One");
    let services = WorkflowServices::new(
        Arc::new(InMemoryApplicationRepository::default()),
        Arc::new(InMemoryNotificationPublisher::default()),
        Arc::new(directory),
        BankAdapters::new(),
        policies,
    );
    let registry = ActionRegistry::standard();
    let allowed = Dispatcher::new(&registry, &services, &actor, application).list_allowed();

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "role": role.label(),
            "status": status,
            "actions": allowed,
        }))?
    );
    Ok(())
}
