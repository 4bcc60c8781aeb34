//! Projection of loaded data into what the page shows.
//!
//! Amounts are converted to ether here and only here; nothing downstream of
//! this module does arithmetic on the strings it produces.

use std::fmt::Write as _;

use alloy_primitives::{utils::format_ether, Address, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::{Level, Notification};
use crate::countdown::Countdown;
use crate::events::{ContributionEvent, SettlementEvent, SettlementKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Donation,
    Withdrawal,
    Refund,
}

impl Tone {
    fn css_class(self) -> &'static str {
        match self {
            Tone::Donation => "in",
            Tone::Withdrawal => "owner",
            Tone::Refund => "out",
        }
    }
}

/// One row of a history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryItem {
    pub title: String,
    pub subtitle: String,
    pub amount: String,
    pub tone: Tone,
}

/// Wei to ether with trailing zeros dropped: `2000000000000000000` → `"2"`.
pub fn format_eth(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => formatted,
    }
}

/// `0x1234...abcd`
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// Donations, newest first.
pub fn render_contributions(events: &[ContributionEvent]) -> Vec<HistoryItem> {
    events
        .iter()
        .rev()
        .map(|event| HistoryItem {
            title: short_address(&event.donor),
            subtitle: "Donor".to_string(),
            amount: format!("+ {} ETH", format_eth(event.amount)),
            tone: Tone::Donation,
        })
        .collect()
}

/// Withdrawals and refunds in the order given (the loader sorts them).
pub fn render_settlements(events: &[SettlementEvent]) -> Vec<HistoryItem> {
    events
        .iter()
        .map(|event| {
            let amount = format!("- {} ETH", format_eth(event.amount));
            match event.kind {
                SettlementKind::Withdrawal => HistoryItem {
                    title: "Owner".to_string(),
                    subtitle: "Funds withdrawn".to_string(),
                    amount,
                    tone: Tone::Withdrawal,
                },
                SettlementKind::Refund => HistoryItem {
                    title: event.counterparty.map_or_else(
                        || "Unknown".to_string(),
                        |a| format!("{}...", &a.to_checksum(None)[..6]),
                    ),
                    subtitle: "Refund".to_string(),
                    amount,
                    tone: Tone::Refund,
                },
            }
        })
        .collect()
}

pub fn deadline_label(deadline: u64) -> Option<String> {
    let seconds = i64::try_from(deadline).ok()?;
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|d| d.to_rfc3339())
}

/// Everything the dashboard shows, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    /// `None` until the first successful load.
    pub campaign: Option<CampaignView>,
    pub donations: Vec<HistoryItem>,
    pub settlements: Vec<HistoryItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignView {
    pub goal: String,
    pub collected: String,
    pub progress: u8,
    pub status: &'static str,
    pub deadline: Option<String>,
    pub countdown: Countdown,
    /// What the connected account has put in so far.
    pub your_contribution: Option<String>,
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn list(out: &mut String, items: &[HistoryItem], empty: &str) {
    out.push_str("<ul>");
    if items.is_empty() {
        let _ = write!(out, "<li class=\"empty\">{}</li>", escape(empty));
    }
    for item in items {
        let _ = write!(
            out,
            "<li><div><strong>{}</strong><small>{}</small></div><span class=\"{}\">{}</span></li>",
            escape(&item.title),
            escape(&item.subtitle),
            item.tone.css_class(),
            escape(&item.amount),
        );
    }
    out.push_str("</ul>");
}

fn disabled(enabled: bool) -> &'static str {
    if enabled {
        ""
    } else {
        " disabled"
    }
}

/// The whole page. Rebuilt from scratch on every request.
pub fn render_page(view: &DashboardView, notifications: &[Notification]) -> String {
    let mut out = String::from(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>CrowdChain</title></head><body>",
    );

    for note in notifications {
        let class = match note.level {
            Level::Success => "success",
            Level::Error => "error",
        };
        let _ = write!(
            out,
            "<p class=\"notice {class}\">{}</p>",
            escape(&note.message)
        );
    }

    out.push_str("<header><h1>CrowdChain</h1>");
    match view.account {
        Some(account) => {
            let _ = write!(
                out,
                "<span id=\"userAccount\">{}</span><button disabled>Connected</button>",
                account.to_checksum(None)
            );
        }
        None => out.push_str(
            "<form method=\"post\" action=\"/connect\"><button>Connect wallet</button></form>",
        ),
    }
    out.push_str("</header>");

    if let Some(campaign) = &view.campaign {
        let affordances = campaign.countdown.affordances;
        let _ = write!(
            out,
            "<section><span class=\"badge\">{}</span>\
             <p>Goal: <b>{} ETH</b></p><p>Collected: <b>{} ETH</b></p>\
             <progress max=\"100\" value=\"{}\"></progress>\
             <p>Time left: <b>{}</b></p>",
            campaign.status,
            escape(&campaign.goal),
            escape(&campaign.collected),
            campaign.progress,
            escape(&campaign.countdown.time_left),
        );
        if let Some(deadline) = &campaign.deadline {
            let _ = write!(out, "<p>Ends: {}</p>", escape(deadline));
        }
        if let Some(mine) = &campaign.your_contribution {
            let _ = write!(out, "<p>Your contribution: {} ETH</p>", escape(mine));
        }
        let _ = write!(
            out,
            "<form method=\"post\" action=\"/donate\">\
             <input name=\"amount\" type=\"number\" step=\"any\" min=\"0\"{d}>\
             <button{d}>{}</button></form>\
             <form method=\"post\" action=\"/withdraw\"><button{}>Withdraw</button></form>\
             <form method=\"post\" action=\"/refund\"><button{}>Refund</button></form></section>",
            if affordances.donate {
                "Donate"
            } else {
                "Campaign closed"
            },
            disabled(affordances.withdraw),
            disabled(affordances.refund),
            d = disabled(affordances.donate),
        );
    } else {
        out.push_str("<section><p>Connect your wallet to load the campaign.</p></section>");
    }

    out.push_str("<h2>Donations</h2>");
    list(&mut out, &view.donations, "No donations yet");
    out.push_str("<h2>Withdrawals &amp; refunds</h2>");
    list(&mut out, &view.settlements, "No withdrawals yet");

    out.push_str("</body></html>");
    out
}

/// Plain-text summary for the terminal.
pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();
    match &view.campaign {
        Some(c) => {
            let _ = writeln!(out, "Status:     {}", c.status);
            let _ = writeln!(out, "Goal:       {} ETH", c.goal);
            let _ = writeln!(out, "Collected:  {} ETH ({}%)", c.collected, c.progress);
            let _ = writeln!(out, "Time left:  {}", c.countdown.time_left);
            let a = c.countdown.affordances;
            let _ = writeln!(
                out,
                "Actions:    donate={} withdraw={} refund={}",
                a.donate, a.withdraw, a.refund
            );
        }
        None => {
            let _ = writeln!(out, "Campaign not loaded");
        }
    }
    let _ = writeln!(out, "\nDonations:");
    for item in &view.donations {
        let _ = writeln!(out, "  {:<14} {}", item.title, item.amount);
    }
    let _ = writeln!(out, "\nWithdrawals & refunds:");
    for item in &view.settlements {
        let _ = writeln!(out, "  {:<14} {:<16} {}", item.title, item.subtitle, item.amount);
    }
    out
}
