use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    ListSession, NoticeKind, RowEvent, SerializerOptions, ShoppingClient, DEFAULT_DEBOUNCE,
};
use shared::{
    domain::{ListId, RowId, MAX_QUANTITY},
    protocol::{ListForm, RowForm},
};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Works on the active shopping list through the server.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, env = "SHOPPING_SERVER_URL", default_value = "http://127.0.0.1:8080")]
    server_url: String,
    /// Delay before each queued row action is sent.
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE.as_millis() as u64)]
    debounce_ms: u64,
    #[arg(long)]
    by_name: bool,
    #[arg(long)]
    group: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Show,
    Start {
        date: String,
        text: Option<String>,
    },
    Add {
        product: String,
        quantity: String,
    },
    Edit {
        row: i64,
        product: String,
        quantity: String,
    },
    Delete {
        row: i64,
    },
    /// Toggle the checked flag of each row, one queued action per row.
    Check {
        rows: Vec<i64>,
    },
    Quantity {
        row: i64,
        quantity: u32,
    },
    Archive,
    Archives,
    ShowArchive {
        list_id: i64,
    },
    Categories,
    Products,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let args = Args::parse();

    let client = Arc::new(ShoppingClient::new(args.server_url));
    match args.command {
        Command::Archives => {
            for list in client.list_archives().await? {
                println!("{:>4}  {}  {}", list.id.0, list.date, list.text.unwrap_or_default());
            }
            return Ok(());
        }
        Command::ShowArchive { list_id } => {
            let details = client.archive_details(ListId(list_id)).await?;
            println!("{}  {}", details.list.date, details.list.text.unwrap_or_default());
            for row in details.rows {
                print_row(row.index, &row.product_name, &row.category_name, row.quantity, row.checked);
            }
            return Ok(());
        }
        Command::Categories => {
            for summary in client.list_categories().await? {
                println!(
                    "{:>4}  {}  ({} products)",
                    summary.category.id.0, summary.category.name, summary.products
                );
            }
            return Ok(());
        }
        Command::Products => {
            for product in client.list_products().await? {
                println!("{:>4}  {}  [{}]", product.id.0, product.name, product.category.name);
            }
            return Ok(());
        }
        _ => {}
    }

    let options = SerializerOptions {
        debounce: Duration::from_millis(args.debounce_ms),
        ..SerializerOptions::default()
    };
    let session = ListSession::open(client, options).await?;
    session.serializer().set_order_by_name(args.by_name);
    session.serializer().set_group_by_category(args.group);
    let mut events = session.serializer().subscribe();
    let mut seen = Vec::new();

    match args.command {
        Command::Show => {}
        Command::Start { date, text } => {
            let list = session.start_list(&ListForm { date, text }).await?;
            println!("A new shopping list was started (list_id={})", list.id.0);
        }
        Command::Add { product, quantity } => {
            let row = session.add_row(&RowForm { product, quantity }).await?;
            println!("row {} now holds {} x{}", row.id.0, row.product.name, row.quantity);
        }
        Command::Edit {
            row,
            product,
            quantity,
        } => {
            let row = session
                .edit_row(RowId(row), &RowForm { product, quantity })
                .await?;
            println!("row {} now holds {} x{}", row.id.0, row.product.name, row.quantity);
        }
        Command::Delete { row } => {
            let row = session.delete_row(RowId(row)).await?;
            println!("The row was deleted ({})", row.product.name);
        }
        Command::Check { rows } => {
            for row in rows {
                if session.toggle_row(RowId(row)).is_none() {
                    println!("Error finding row {row}!");
                }
            }
            session.serializer().drained().await;
        }
        Command::Quantity { row, quantity } => match session.quantity_editor(RowId(row)) {
            Some(mut editor) => {
                while editor.value() < quantity.min(MAX_QUANTITY) {
                    editor.increment();
                }
                while editor.value() > quantity && editor.can_decrement() {
                    editor.decrement();
                }
                if session.commit_quantity(&mut editor) {
                    session.serializer().drained().await;
                    seen = pending_events(&mut events);
                    for event in &seen {
                        editor.apply_event(event);
                    }
                }
                println!("row {row} quantity {}", editor.value());
            }
            None => println!("Error finding row {row}!"),
        },
        Command::Archive => {
            session.archive().await?;
            println!("The shopping list was archived.");
        }
        Command::Archives
        | Command::ShowArchive { .. }
        | Command::Categories
        | Command::Products => {}
    }

    seen.extend(pending_events(&mut events));
    print_notices(&seen);
    print_list(&session);
    Ok(())
}

fn pending_events(events: &mut broadcast::Receiver<RowEvent>) -> Vec<RowEvent> {
    let mut pending = Vec::new();
    while let Ok(event) = events.try_recv() {
        pending.push(event);
    }
    pending
}

fn print_notices(events: &[RowEvent]) {
    for event in events {
        match event {
            RowEvent::Notice(notice) => {
                let marker = match notice.kind {
                    NoticeKind::Success => "ok",
                    NoticeKind::Error => "error",
                };
                println!("[{marker}] {}: {}", notice.title, notice.message);
            }
            RowEvent::QuantityRollback { row, quantity, .. } => {
                println!("row {} quantity back to {quantity}", row.0);
            }
            RowEvent::QuantitySaved { .. } | RowEvent::RowsChanged => {}
        }
    }
}

fn print_list(session: &ListSession) {
    let Some(list) = session.list() else {
        println!("No active shopping list.");
        return;
    };
    println!("{}  {}", list.date, list.text.unwrap_or_default());
    for row in session.serializer().view_rows() {
        print!("[{:>4}] ", row.id.0);
        print_row(row.index, &row.product_name, &row.category_name, row.quantity, row.checked);
    }
}

fn print_row(index: i64, product: &str, category: &str, quantity: u32, checked: bool) {
    println!(
        "{index:>3}. {product:<30} {category:<20} x{quantity}{}",
        if checked { "  [x]" } else { "" }
    );
}
