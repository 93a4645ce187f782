use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use shared::{
    domain::{Category, CategoryId, ListId, ProductId},
    error::ApiError,
    protocol::{CategoryForm, ProductForm},
    validation,
};
use storage::Storage;

/// Maintenance commands that work on the database directly.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/shopping.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database if needed and apply migrations.
    Migrate,
    Categories,
    CreateCategory {
        name: String,
    },
    RenameCategory {
        category_id: i64,
        name: String,
    },
    Products,
    CreateProduct {
        category_id: i64,
        name: String,
    },
    RenameProduct {
        product_id: i64,
        category_id: i64,
        name: String,
    },
    /// Move the active list and its rows to the archive.
    Archive,
    Archives,
    ShowArchive {
        list_id: i64,
    },
}

fn invalid(err: ApiError) -> anyhow::Error {
    anyhow!(err.detail())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::Migrate => {
            storage.health_check().await?;
            println!("database ready at {}", cli.database_url);
        }
        Command::Categories => {
            for summary in storage.list_categories().await? {
                println!(
                    "{:>4}  {}  ({} products)",
                    summary.category.id.0, summary.category.name, summary.products
                );
            }
        }
        Command::CreateCategory { name } => {
            let name = validation::category_form(&CategoryForm { name }).map_err(invalid)?;
            let category_id = storage.create_category(&name).await?;
            println!("created category_id={}", category_id.0);
        }
        Command::RenameCategory { category_id, name } => {
            let name = validation::category_form(&CategoryForm { name }).map_err(invalid)?;
            storage
                .update_category(&Category {
                    id: CategoryId(category_id),
                    name,
                })
                .await?;
            println!("renamed category_id={category_id}");
        }
        Command::Products => {
            for product in storage.list_products().await? {
                println!(
                    "{:>4}  {}  [{}]",
                    product.id.0, product.name, product.category.name
                );
            }
        }
        Command::CreateProduct { category_id, name } => {
            let (name, category) = validation::product_form(&ProductForm {
                name,
                category_id: category_id.to_string(),
            })
            .map_err(invalid)?;
            let product_id = storage.create_product(&name, category).await?;
            println!("created product_id={}", product_id.0);
        }
        Command::RenameProduct {
            product_id,
            category_id,
            name,
        } => {
            let (name, category) = validation::product_form(&ProductForm {
                name,
                category_id: category_id.to_string(),
            })
            .map_err(invalid)?;
            storage
                .update_product(ProductId(product_id), &name, category)
                .await?;
            println!("updated product_id={product_id}");
        }
        Command::Archive => {
            let archived = storage.archive_active_list().await?;
            if archived.is_empty() {
                println!("no active shopping list");
            }
            for list_id in archived {
                println!("archived list_id={}", list_id.0);
            }
        }
        Command::Archives => {
            for list in storage.list_archives().await? {
                println!(
                    "{:>4}  {}  {}",
                    list.id.0,
                    list.date,
                    list.text.unwrap_or_default()
                );
            }
        }
        Command::ShowArchive { list_id } => {
            let Some((list, rows)) = storage.archive_details(ListId(list_id)).await? else {
                return Err(anyhow!("archived list {list_id} not found"));
            };
            println!("{}  {}", list.date, list.text.unwrap_or_default());
            for row in rows {
                println!(
                    "{:>3}. {:<30} {:<20} x{}{}",
                    row.index,
                    row.product_name,
                    row.category_name,
                    row.quantity,
                    if row.checked { "  [x]" } else { "" }
                );
            }
        }
    }

    Ok(())
}
