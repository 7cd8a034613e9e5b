use serde::Serialize;
use tokio::signal;
use warehouse_client::application_port::*;
use warehouse_client::client::*;
use warehouse_client::domain_model::*;
use warehouse_client::logger::*;
use warehouse_client::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let client = Client::try_new(&project_settings).await?;

    let Some(command) = cli.command else {
        print_json(&client.session.is_authenticated())?;
        return Ok(());
    };

    match command {
        Command::Login { username, password } => {
            let session = client.session.login(Credentials::new(username, password)).await?;
            print_json(&session.role)?;
        }
        Command::Logout => {
            client.session.logout().await;
        }
        Command::Whoami => {
            let role = client.session.load_current_user().await?;
            print_json(&role)?;
        }
        Command::Guard { path, require } => {
            let requirement = require
                .as_deref()
                .map(str::parse::<RoleRequirement>)
                .transpose()
                .map_err(|e| anyhow::anyhow!(e))?;
            if requirement.is_some() && client.session.is_authenticated() {
                if let Err(e) = client.session.load_current_user().await {
                    warn!(error = %e, "could not load current user");
                }
            }
            let decision = client.session.enforce_guard(&path, requirement);
            println!("{:?}", decision);
        }
        Command::Request { method, path, json } => {
            let method = method.parse::<Method>().map_err(|e| anyhow::anyhow!(e))?;
            let mut options = RequestOptions::default();
            if let Some(json) = json {
                options.body = Some(serde_json::from_str(&json)?);
            }
            let resp = client
                .session
                .authenticated_request(Endpoint::new(method, path), options)
                .await?;
            info!(status = resp.status, "response");
            println!("{}", resp.text());
        }
        Command::Keepalive => {
            client.start_renewal();
            info!("keeping session alive, press Ctrl-C to stop");
            signal::ctrl_c().await?;
        }
        Command::Equipment => print_json(&client.warehouse.list_equipment().await?)?,
        Command::Scan { qr } => print_json(&client.warehouse.scan(&qr).await?)?,
        Command::Issue {
            equipment_id,
            target_user_id,
            notes,
            due_at,
        } => {
            let due_at = due_at
                .as_deref()
                .map(chrono::DateTime::parse_from_rfc3339)
                .transpose()?
                .map(|d| d.with_timezone(&chrono::Utc));
            let request = IssueRequest {
                equipment_id: equipment_id.parse()?,
                target_user_id,
                notes,
                due_at,
            };
            print_json(&client.warehouse.issue(request).await?)?;
        }
        Command::Return {
            equipment_id,
            condition,
            notes,
        } => {
            let request = ReturnRequest {
                equipment_id: equipment_id.parse()?,
                condition: condition.parse().map_err(|e: String| anyhow::anyhow!(e))?,
                notes,
            };
            print_json(&client.warehouse.return_equipment(request).await?)?;
        }
        Command::Inventory { action } => match action {
            InventoryAction::Start { location } => {
                print_json(&client.warehouse.start_inventory(location).await?)?
            }
            InventoryAction::Scan {
                session,
                equipment_id,
            } => {
                let scanned = client
                    .warehouse
                    .scan_inventory(InventorySessionId(session), equipment_id.parse()?)
                    .await?;
                print_json(&scanned)?;
            }
            InventoryAction::Finish { session } => {
                print_json(&client.warehouse.finish_inventory(InventorySessionId(session)).await?)?
            }
        },
        Command::Notifications { action } => match action {
            NotificationsAction::List => print_json(&client.warehouse.notifications().await?)?,
            NotificationsAction::Read => {
                print_json(&client.warehouse.mark_notifications_read().await?)?
            }
            NotificationsAction::Overdue => print_json(&client.warehouse.overdue().await?)?,
        },
        Command::Stats => print_json(&client.warehouse.stats().await?)?,
    }

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, client.shutdown()).await {
        Ok(_) => info!("client shutdown successfully"),
        Err(_) => error!("client shutdown timed out"),
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
