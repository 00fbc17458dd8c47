use crate::infra::{DemoBankAdapter, InMemoryApplicationRepository, InMemoryNotificationPublisher};
use clap::Args;
use guarantee_flow::error::AppError;
use guarantee_flow::workflows::guarantee::{
    ActionParams, ActionRegistry, Actor, Application, ApplicationId, BankAdapters, GroupId,
    GuaranteeWorkflowService, PolicyTree, Role, StaticDirectory, StatusCode, WorkflowServices,
};
use rust_decimal::Decimal;
use std::sync::Arc;

const CLIENT_ID: &str = "client-1";
const AGENT_ID: &str = "agent-1";
const VERIFIER_ID: &str = "verifier-1";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Banks the request is fanned out to, comma separated
    #[arg(long, value_delimiter = ',', default_value = "bank-a,bank-b,bank-c")]
    pub(crate) banks: Vec<String>,
    /// Bank whose offer the client accepts. Defaults to the first bank.
    #[arg(long)]
    pub(crate) winner: Option<String>,
    /// Bank whose integration asks for the client's signature before review
    #[arg(long)]
    pub(crate) signature_bank: Option<String>,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            banks: vec![
                "bank-a".to_string(),
                "bank-b".to_string(),
                "bank-c".to_string(),
            ],
            winner: None,
            signature_bank: None,
        }
    }
}

struct Cast {
    client: Actor,
    verifier: Actor,
}

impl Cast {
    fn new() -> Self {
        let mut client = Actor::new("client-user", Role::Client);
        client.client_id = Some(CLIENT_ID.to_string());
        Self {
            client,
            verifier: Actor::new(VERIFIER_ID, Role::Verifier),
        }
    }

    fn bank(&self, bank_id: &str) -> Actor {
        let mut actor = Actor::new(format!("{bank_id}-officer"), Role::Bank);
        actor.bank_id = Some(bank_id.to_string());
        actor
    }
}

pub(crate) fn run_demo(args: DemoArgs, policies: PolicyTree) -> Result<(), AppError> {
    let DemoArgs {
        banks,
        winner,
        signature_bank,
    } = args;
    let banks: Vec<String> = banks
        .into_iter()
        .map(|bank| bank.trim().to_string())
        .filter(|bank| !bank.is_empty())
        .collect();
    let Some(first_bank) = banks.first().cloned() else {
        println!("No banks given; nothing to demonstrate.");
        return Ok(());
    };
    let winner = winner.unwrap_or(first_bank);
    if !banks.contains(&winner) {
        println!("Winning bank '{winner}' is not among {}", banks.join(", "));
        return Ok(());
    }

    let repository = InMemoryApplicationRepository::default();
    let notifications = InMemoryNotificationPublisher::default();
    let adapters = banks.iter().fold(BankAdapters::new(), |adapters, bank| {
        let requires_signature = signature_bank.as_deref() == Some(bank.as_str());
        adapters.register(
            bank.clone(),
            Arc::new(DemoBankAdapter::new(bank.clone(), requires_signature)),
        )
    });
    let directory = StaticDirectory::default()
        .with_member(Role::Verifier, VERIFIER_ID, "Verifier One")
        .with_member(Role::Verifier, "verifier-2", "Verifier Two")
        .with_member(Role::Agent, AGENT_ID, "Agent One");
    let services = WorkflowServices::new(
        Arc::new(repository.clone()),
        Arc::new(notifications.clone()),
        Arc::new(directory),
        adapters,
        policies,
    );
    let service = GuaranteeWorkflowService::new(services, ActionRegistry::standard());
    let cast = Cast::new();

    let mut template = Application::draft(
        ApplicationId("request-1".to_string()),
        GroupId::generate(),
        CLIENT_ID,
    );
    template.agent_id = Some(AGENT_ID.to_string());
    template.required_amount = Some(Decimal::new(2_500_000, 0));

    println!("Bank Guarantee Workflow Demo");
    println!("============================");
    let drafts = service.services().coordinator.fan_out(&template, &banks)?;
    println!(
        "Fanned request {} out to {} banks (group {})",
        template.id,
        drafts.len(),
        template.group_id.0
    );

    for (index, draft) in drafts.iter().enumerate() {
        let bank_id = draft.bank_id.clone().unwrap_or_default();
        let officer = cast.bank(&bank_id);
        let id = &draft.id;

        step(&service, id, &cast.client, "send_to_verification", ActionParams::new())?;
        step(&service, id, &cast.verifier, "take_to_verification", ActionParams::new())?;
        step(&service, id, &cast.verifier, "approve", ActionParams::new())?;
        step(&service, id, &cast.client, "send_to_bank", ActionParams::new())?;
        if service.get(id)?.status() == StatusCode::AwaitingSignature {
            step(&service, id, &cast.client, "sign", ActionParams::new())?;
        }
        step(&service, id, &officer, "take_in_work", ActionParams::new())?;

        // The last bank never answers, so its application is withdrawn on acceptance.
        if index + 1 < drafts.len() || bank_id == winner {
            let commission = Decimal::new(15 + index as i64 * 5, 1);
            let params = ActionParams::new()
                .with("amount", "2500000")
                .with("commission", commission.to_string())
                .with("term_days", 365);
            step(&service, id, &officer, "create_offer", params)?;
        }
    }

    let winning_id = ApplicationId(format!("{}-{winner}", template.id));
    let accepted = service.dispatch(&winning_id, &cast.client, "accept_offer", &ActionParams::new())?;
    println!();
    println!("Offer accepted on {winning_id}");
    println!("{}", serde_json::to_string_pretty(&accepted.data)?);

    let officer = cast.bank(&winner);
    step(&service, &winning_id, &officer, "request_payment", ActionParams::new())?;
    step(&service, &winning_id, &cast.client, "confirm_payment", ActionParams::new())?;
    step(
        &service,
        &winning_id,
        &officer,
        "finish",
        ActionParams::new().with("guarantee_number", "BG-2026-0001"),
    )?;

    println!();
    println!("Final statuses:");
    for draft in &drafts {
        let stored = service.get(&draft.id)?;
        println!(
            "- {} [{}]: {}",
            stored.id,
            stored.bank_id.as_deref().unwrap_or("-"),
            stored.status()
        );
    }
    println!(
        "Audit log entries: {} | notifications published: {}",
        repository.log_len(),
        notifications.published()
    );

    Ok(())
}

fn step(
    service: &GuaranteeWorkflowService,
    application_id: &ApplicationId,
    actor: &Actor,
    code: &str,
    params: ActionParams,
) -> Result<(), AppError> {
    let outcome = service.dispatch(application_id, actor, code, &params)?;
    match outcome.transition {
        Some(record) => println!(
            "  {application_id}: {code} by {} ({} -> {})",
            actor.id, record.from, record.to
        ),
        None => println!("  {application_id}: {code} by {}", actor.id),
    }
    Ok(())
}
