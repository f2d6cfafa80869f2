//! User-visible status texts.

use std::time::Duration;

use crate::{
    core::{source::FetchError, types::ScanSummary},
    utils::format::{format_address, format_duration},
};

pub const COMMAND: &str = "uniquecontracts";

pub fn usage() -> String {
    format!("Provide address: /{COMMAND} <address>")
}

pub fn accepted(address: &str) -> String {
    format!("⏱️ Queued scan request for {}...", format_address(address))
}

pub fn queued(position: usize) -> String {
    format!("⌛ Scanner busy. Added to queue.\nYour position: #{position}")
}

pub fn starting(address: &str) -> String {
    format!(
        "🔬 Starting transaction scan for {}...\nThis may take minutes.\nProgress updates appear here.",
        format_address(address)
    )
}

pub fn your_turn(address: &str) -> String {
    format!("✅ Your turn! Starting scan for {}...", format_address(address))
}

pub fn already_queued(position: usize) -> String {
    format!("You are already in the queue (Position: #{position}). Please wait.")
}

pub fn already_running() -> String {
    "Your scan is already in progress.".to_string()
}

pub fn cooling_down(period: Duration, remaining: Duration) -> String {
    format!(
        "⏳ Scan limit: 1 per {}. Wait {}.",
        format_duration(period),
        format_duration(remaining)
    )
}

pub fn closed() -> String {
    "🛑 Scanner is shutting down and not accepting new scans.".to_string()
}

pub fn progress(page: u64, txns_processed: u64, unique: usize) -> String {
    format!("🔬 Scanning... (Page: {page})\nTxns checked: ~{txns_processed}\nUnique found: {unique}")
}

pub fn completed(summary: &ScanSummary) -> String {
    format!(
        "✅ Scan Complete for {}!\n\nTotal Transactions Processed: {}\nUnique Addresses Interacted With: {}",
        format_address(&summary.address),
        summary.txns_processed,
        summary.unique_counterparts
    )
}

pub fn failed(error: &FetchError) -> String {
    format!("⚠️ Scan failed: {error}")
}

pub fn timed_out(address: &str, timeout: Duration) -> String {
    format!(
        "⚠️ Scan timed out ({}) for {}.",
        format_duration(timeout),
        format_address(address)
    )
}

pub fn internal_error() -> String {
    "An unexpected error occurred during the scan.".to_string()
}

pub fn dropped(address: &str, reason: &str) -> String {
    format!(
        "⚠️ Scan for {} was dropped before it started ({reason}). Your cooldown was reset, please try again later.",
        format_address(address)
    )
}
