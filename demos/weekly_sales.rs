//! Example: a month of sales, fetched week by week
//!
//! Builds a SALES report over a date range that is too long for a single
//! request, one week-aligned window at a time, and prints the merged totals.
//!
//! # Setup
//!
//! Put the server credentials in the environment or a `.env` file:
//!
//! ```text
//! RMS_BASE_URL=https://your-server.iiko.it/resto/api
//! RMS_LOGIN=admin
//! RMS_PASSWORD=secret
//! ```
//!
//! Then run, optionally passing the range:
//!
//! ```text
//! cargo run --example weekly_sales -- 2026-01-01 2026-02-02
//! ```

use iiko_api::reports::{parse_api_date, ReportRequest, ReportType};
use iiko_api::{IikoClient, IikoConfig};
use tracing_subscriber::EnvFilter;

const GROUP_BY: [&str; 4] = ["OpenDate.Typed", "Department", "WaiterName", "PayTypes"];

const AGGREGATES: [&str; 8] = [
    "DiscountSum",
    "DishDiscountSumInt",
    "discountWithoutVAT",
    "DishDiscountSumInt.withoutVAT",
    "sumAfterDiscountWithoutVAT",
    "IncreaseSum",
    "GuestNum",
    "Bonus.Sum",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iiko_api=info")),
        )
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let from = parse_api_date(&args.next().unwrap_or_else(|| "2026-01-01".to_string()))?;
    let to = parse_api_date(&args.next().unwrap_or_else(|| "2026-02-02".to_string()))?;

    let request = ReportRequest::new(ReportType::Sales)
        .date_range(from, to)
        .group_by(GROUP_BY)
        .aggregate(AGGREGATES);

    let client = IikoClient::new(IikoConfig::load()?)?;
    println!("Connecting with {client}");

    let result = client
        .scoped(async |client: &IikoClient| {
            client
                .olap()
                .build_report_chunked(&request, Some("OpenDate.Typed"))
                .await
        })
        .await?;

    println!("\nChunks:");
    for chunk in &result.chunks {
        println!(
            "  {} -> {}: {} rows",
            chunk.window_start, chunk.window_end, chunk.row_count
        );
    }

    println!("\nColumns: {}", result.report.columns.join(", "));
    println!("Rows:    {}", result.row_count());

    match &result.report.summary {
        Some(summary) => {
            println!("\nTotals:");
            for (field, value) in summary {
                println!("  {field:<32} {value}");
            }
        }
        None => println!("\nThe server returned no totals"),
    }

    Ok(())
}
