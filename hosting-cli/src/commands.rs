//! Command execution over `AppState`

use anyhow::Context;
use hosting_app::adapters::SqliteStore;
use hosting_app::AppState;
use hosting_core::quota::MIB;
use hosting_core::types::{Actor, CustomerLimitsSource, NewCustomer, NewResource, OperationReport};
use serde::Serialize;

use crate::cli::{max_domains, Command};

pub async fn run(
    state: &AppState,
    store: &SqliteStore,
    actor: &Actor,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Overview { customer_id } => {
            print_json(&state.limit_service.usage_overview(actor, customer_id).await?)
        }
        Command::ChangeLimits {
            customer_id,
            limits,
        } => report(
            &state
                .limit_service
                .change_limits(actor, customer_id, limits.to_limits()?)
                .await?,
        ),
        Command::ChangeStatus {
            customer_id,
            action,
        } => report(
            &state
                .status_service
                .change_status(actor, customer_id, action.into())
                .await?,
        ),
        Command::DeleteCustomer { customer_id } => report(
            &state
                .deletion_service
                .delete_customer(actor, customer_id)
                .await?,
        ),
        Command::DeleteAlias { alias_id } => report(
            &state
                .deletion_service
                .delete_domain_alias(actor, alias_id)
                .await?,
        ),
        Command::DeleteSqlDb {
            domain_id,
            database_id,
        } => report(
            &state
                .deletion_service
                .delete_sql_database(actor, domain_id, database_id)
                .await?,
        ),
        Command::Prorate { domain_id, mib } => {
            let bytes = mib
                .checked_mul(MIB)
                .with_context(|| format!("{mib} MiB does not fit in a byte count"))?;
            report(
                &state
                    .mail_quota_service
                    .prorate_mailbox_quota(actor, domain_id, bytes)
                    .await?,
            )
        }
        Command::ResyncPool { reseller_id } => {
            print_json(&state.pool_service.resync_reseller_pool(actor, reseller_id).await?)
        }
        Command::UpdatePlan { plan_id, limits } => print_json(
            &state
                .plan_service
                .update_hosting_plan(actor, plan_id, limits.to_limits()?)
                .await?,
        ),
        Command::CreateCustomer { name, domain, plan } => {
            let request = NewCustomer {
                name,
                domain_name: domain,
                limits: CustomerLimitsSource::Plan(plan),
            };
            let (customer, operation) = state
                .customer_service
                .create_customer(actor, request)
                .await?;
            print_json(&customer)?;
            report(&operation)
        }
        Command::AddResource {
            customer_id,
            resource,
        } => {
            let resource: NewResource =
                serde_json::from_str(&resource).context("Invalid resource description")?;
            let (entity, operation) = state
                .customer_service
                .add_resource(actor, customer_id, resource)
                .await?;
            tracing::info!("Added {entity}");
            report(&operation)
        }
        Command::ReviewAlias { alias_id, reject } => report(
            &state
                .customer_service
                .review_alias_order(actor, alias_id, !reject)
                .await?,
        ),
        Command::CreateReseller {
            name,
            max_domains: raw,
            limits,
        } => print_json(
            &store
                .create_reseller(&name, max_domains(raw)?, &limits.to_limits()?)
                .await?,
        ),
        Command::CreatePlan {
            reseller_id,
            name,
            limits,
        } => print_json(
            &store
                .create_hosting_plan(reseller_id, &name, &limits.to_limits()?)
                .await?,
        ),
        Command::Acknowledge => {
            let rows = store.acknowledge_pending().await?;
            println!("{rows}");
            Ok(())
        }
        Command::Dispatch => {
            state.dispatch_pending().await?;
            Ok(())
        }
    }
}

/// Print the report and surface its warnings on stderr.
fn report(report: &OperationReport) -> anyhow::Result<()> {
    for warning in report.warnings() {
        tracing::warn!("{warning}");
    }
    print_json(report)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
