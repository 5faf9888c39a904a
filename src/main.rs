use albion_market_bot::app::{MarketApp, ViewId};
use albion_market_bot::filter_policy::FilterPolicy;
use albion_market_bot::locations;
use albion_market_bot::market_fetcher::{AlbionDataApi, SnapshotProvider};
use albion_market_bot::result_set::ResultTable;
use albion_market_bot::shared_types::Outcome;
use dotenv::dotenv;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

const EXPORT_DIR: &str = "Databases";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let provider = AlbionDataApi::from_env()?;
    let mut app = MarketApp::new(provider, FilterPolicy::from_env());

    println!("[INFO] Market application initialized");
    println!("[INFO] Ready for commands. Type 'help' for available commands.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = args.first() else {
            continue;
        };

        match command {
            "exit" | "quit" => break,
            "help" => show_help(),
            "locations" => {
                for (short, full) in locations::list_locations() {
                    println!("  {} - {}", short, full);
                }
            }
            "filters" => println!("[INFO] {}", app.current_filters().message),
            "set" => handle_set(&mut app, &args[1..]),
            "show" => match args.get(1) {
                Some(loc) => {
                    let outcome = app.get_listing(loc).await;
                    report_table(outcome);
                }
                None => println!("[ERROR] show: missing location"),
            },
            "bulk" => handle_bulk(&mut app, &args[1..]).await,
            "sort" => handle_sort(&mut app, &args[1..]),
            "csv" => handle_csv(&app, &args[1..]),
            other => println!("[ERROR] Unknown command: {}", other),
        }
    }

    Ok(())
}

fn show_help() {
    println!("Available commands:");
    println!("  help                   - Show this help message");
    println!("  locations              - List location short codes");
    println!("  filters                - Show current filter settings");
    println!("  set tier [expr]        - Set tier filter (e.g. '4.0 5.1', empty clears)");
    println!("  set quality [1-5]      - Set quality filter (empty clears)");
    println!("  set diff [num]         - Set minimum profit ratio (e.g. '1.3')");
    println!("  show [location]        - Show the filtered listing for a location");
    println!("  bulk [locations]       - Compare locations against the black market");
    println!("  sort [view] [column]   - Sort a view (listing|qs|so) by column index");
    println!("  csv [view] [name]      - Export a view to {}/<name>.csv", EXPORT_DIR);
    println!("  exit                   - Exit the application");
}

fn handle_set<P: SnapshotProvider>(app: &mut MarketApp<P>, args: &[&str]) {
    let outcome = match args.first() {
        Some(&"tier") => app.set_tier_filter(&args[1..].join(" ")),
        Some(&"quality") => app.set_quality_filter(args.get(1).copied().unwrap_or("")),
        Some(&"diff") => app.set_min_diff_filter(args.get(1).copied().unwrap_or("")),
        _ => {
            println!("[ERROR] set: use 'set tier', 'set quality' or 'set diff'");
            return;
        }
    };
    report(&outcome);
}

async fn handle_bulk<P: SnapshotProvider>(app: &mut MarketApp<P>, args: &[&str]) {
    if args.is_empty() {
        println!("[ERROR] bulk: specify at least one reference location");
        return;
    }
    for loc in args {
        let reference = locations::resolve(loc);
        if reference == locations::BLACK_MARKET {
            continue;
        }
        println!("[INFO] Comparing {} with {}...", reference, locations::BLACK_MARKET);
        let outcome = app.compare(&reference, locations::BLACK_MARKET).await;
        if !outcome.success {
            println!("[ERROR] {}", outcome.message);
            continue;
        }
        println!("[INFO] {}", outcome.message);
        if let Some(tables) = outcome.data {
            if !tables.quick_sell.is_empty() {
                println!("\nQuick Sell Opportunities:");
                print_table(&tables.quick_sell);
            }
            if !tables.sell_order.is_empty() {
                println!("\nSell Order Opportunities:");
                print_table(&tables.sell_order);
            }
            if tables.quick_sell.is_empty() && tables.sell_order.is_empty() {
                println!("[INFO] No profitable opportunities found");
            }
        }
    }
}

fn handle_sort<P: SnapshotProvider>(app: &mut MarketApp<P>, args: &[&str]) {
    let (Some(view), Some(column)) = (args.first().and_then(|v| parse_view(v)), args.get(1))
    else {
        println!("[ERROR] sort: use 'sort [listing|qs|so] [column index]'");
        return;
    };
    match column.parse::<usize>() {
        Ok(index) => report_table(app.sort(view, index)),
        Err(_) => println!("[ERROR] sort: column must be a number"),
    }
}

fn handle_csv<P: SnapshotProvider>(app: &MarketApp<P>, args: &[&str]) {
    let Some(view) = args.first().and_then(|v| parse_view(v)) else {
        println!("[ERROR] csv: use 'csv [listing|qs|so] [name]'");
        return;
    };
    let name = args.get(1).copied().unwrap_or(view.label()).replace(' ', "_");
    let outcome = app.export_view(view, Path::new(EXPORT_DIR), &name);
    report(&outcome);
}

fn parse_view(value: &str) -> Option<ViewId> {
    match value {
        "listing" | "l" => Some(ViewId::Listing),
        "qs" | "quick" | "quicksell" => Some(ViewId::QuickSell),
        "so" | "sell" | "sellorder" => Some(ViewId::SellOrder),
        _ => None,
    }
}

fn report<T>(outcome: &Outcome<T>) {
    if outcome.success {
        println!("[INFO] {}", outcome.message);
    } else {
        println!("[ERROR] {}", outcome.message);
    }
}

fn report_table(outcome: Outcome<ResultTable>) {
    report(&outcome);
    if let Some(table) = outcome.data {
        print_table(&table);
    }
}

fn print_table(table: &ResultTable) {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.len()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header: Vec<String> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect();
    println!("{}", header.join("  "));

    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:<width$}", c, width = widths.get(i).copied().unwrap_or(0)))
            .collect();
        println!("{}", cells.join("  "));
    }
}
