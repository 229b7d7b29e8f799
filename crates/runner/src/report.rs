//! Human-readable run summaries on stdout.

use execution_core::OrderOutcome;
use strategy_runner::{ChunkResult, GridReport, OcoOutcome, OcoResolution, TwapReport};

pub fn print_order(outcome: &OrderOutcome) {
    println!(
        "Order {} ({}) {} {} | status: {} | filled: {} @ {}",
        outcome.order_id,
        outcome.client_order_id,
        outcome.side,
        outcome.symbol,
        outcome.status,
        outcome.filled_quantity,
        outcome
            .average_price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".into()),
    );
}

pub fn print_oco(oco: &OcoOutcome) {
    println!("Take-profit leg:");
    print_order(&oco.take_profit);
    println!("Stop-loss leg:");
    print_order(&oco.stop_loss);
}

pub fn print_oco_resolution(resolution: &OcoResolution) {
    match resolution {
        OcoResolution::Filled {
            leg,
            fill,
            counterpart_closed,
        } => {
            println!("\nOCO resolved: {} filled", leg);
            print_order(fill);
            if !counterpart_closed {
                println!("  WARNING: the other leg could not be cancelled and may still be open");
            }
        }
        OcoResolution::Closed => println!("\nOCO closed: both legs ended without a fill"),
        OcoResolution::Stopped => println!("\nOCO monitoring stopped; both legs remain open"),
    }
}

pub fn print_twap(report: &TwapReport) {
    let plan = &report.plan;
    println!(
        "\nTWAP {} {} {} | phase: {:?} | elapsed: {:.1}s",
        plan.side,
        plan.total_quantity,
        plan.symbol,
        report.phase,
        report.elapsed.as_secs_f64()
    );
    for record in &report.records {
        match &record.result {
            ChunkResult::Executed(outcome) => println!(
                "  chunk {:>3} +{:>6.1}s  qty {}  {}  filled {} @ {}",
                record.index + 1,
                record.offset.as_secs_f64(),
                record.requested_quantity,
                outcome.status,
                outcome.filled_quantity,
                outcome
                    .average_price
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
            ChunkResult::Failed(e) => println!(
                "  chunk {:>3} +{:>6.1}s  qty {}  FAILED ({}): {}",
                record.index + 1,
                record.offset.as_secs_f64(),
                record.requested_quantity,
                e.kind(),
                e
            ),
        }
    }

    let stats = &report.stats;
    println!(
        "  chunks: {} ok / {} failed of {}",
        stats.succeeded, stats.failed, plan.chunk_count
    );
    println!("  total filled: {}", stats.total_filled);
    match stats.vwap {
        Some(vwap) => println!("  VWAP: {}", vwap.round_dp(8)),
        None => println!("  VWAP: undefined (nothing filled)"),
    }
    println!("  quote value: {}", stats.quote_value);
    if let Some(e) = &report.aborted_by {
        println!("  aborted: {}", e);
    }
}

pub fn print_grid(report: &GridReport) {
    println!(
        "\nGrid {} | phase: {:?}\n  realized profit: {}\n  fills: {} buys / {} sells\n  orders cancelled: {}\n  open orders remaining: {}",
        report.symbol,
        report.phase,
        report.realized_profit,
        report.buys_filled,
        report.sells_filled,
        report.orders_cancelled,
        report.open_orders_remaining
    );
    if let Some(e) = &report.aborted_by {
        println!("  aborted: {}", e);
    }
}
