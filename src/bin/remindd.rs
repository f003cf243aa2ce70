use anyhow::Result;
use dotenvy::dotenv;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use remindd::core::{Clock, Config, SystemClock};
use remindd::database::Database;
use remindd::features::reminders::{
    describe, event_channel, format_duration, parse_request, DeliveryChain, DesktopSink,
    PopupSink, ReminderEvent, ReminderScheduler, ReminderWorker,
};

fn print_help() {
    println!("Commands:");
    println!("  remind me in <30m|2h|1h30m> [to] <what>   timed reminder");
    println!("  remind me <anything else>                 on-condition reminder");
    println!("  list                                      show active reminders");
    println!("  clear                                     delete all reminders");
    println!("  quit                                      stop the daemon");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting reminder daemon...");

    let database = Database::new(&config.database_path).await?;
    let (events, mut presentation_rx) = event_channel();

    let delivery = DeliveryChain::new(
        Arc::new(DesktopSink::new(
            config.notify_command.clone(),
            config.notification_title.clone(),
        )),
        config.delivery_timeout,
    )
    .with_fallback(Arc::new(PopupSink::new(events.clone())));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let worker = ReminderWorker::new(database, delivery, clock.clone(), events);
    let scheduler = Arc::new(ReminderScheduler::start(worker, config.check_interval));

    // Terminal presentation: shows popups and delivery notices on its own task
    let title = config.notification_title.clone();
    let list_source = scheduler.clone();
    let presentation = tokio::spawn(async move {
        loop {
            match presentation_rx.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        debug!("Reminder event: {}", json);
                    }
                    let refresh = event.changes_reminder_list();
                    match event {
                        ReminderEvent::Popup { message } => println!("🔔 [{}] {}", title, message),
                        ReminderEvent::Delivered { id, .. } => println!("(reminder #{} done)", id),
                        _ => {}
                    }
                    if refresh {
                        match list_source.list_active().await {
                            Ok(reminders) => println!("({} active reminder(s))", reminders.len()),
                            Err(e) => debug!("Could not refresh reminder list: {}", e),
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Presentation lagged behind by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read from stdin: {}", e);
                break;
            }
        };
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => continue,
            "help" => print_help(),
            "quit" | "exit" => break,
            "list" => match scheduler.list_active().await {
                Ok(reminders) if reminders.is_empty() => println!("No active reminders."),
                Ok(reminders) => {
                    for reminder in &reminders {
                        println!("{}", describe(reminder));
                    }
                }
                Err(e) => error!("Failed to list reminders: {}", e),
            },
            "clear" => match scheduler.clear_all().await {
                Ok(count) => println!("Deleted {} reminder(s).", count),
                Err(e) => error!("Failed to clear reminders: {}", e),
            },
            _ => {
                let Some(request) = parse_request(line, clock.now()) else {
                    println!("Unrecognised input. Type 'help' for commands.");
                    continue;
                };
                match scheduler
                    .add_reminder(&request.condition, request.target_time)
                    .await
                {
                    Ok(reminder) => match reminder.target_time {
                        Some(at) => println!(
                            "Reminder #{} created: {} (in {})",
                            reminder.id,
                            reminder.condition,
                            format_duration((at - clock.now()).num_seconds().max(0))
                        ),
                        None => println!(
                            "Reminder #{} created: {} (on condition)",
                            reminder.id, reminder.condition
                        ),
                    },
                    Err(e) => println!("Could not create reminder: {}", e),
                }
            }
        }
    }

    scheduler.shutdown().await;
    presentation.abort();
    info!("Reminder daemon stopped");

    Ok(())
}
